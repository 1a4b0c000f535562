use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use std::f32::consts::{FRAC_PI_2, TAU};

// Off the poles, where `looking_at` degenerates.
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;
const ZOOM_STEP: f32 = 0.95;

#[derive(Resource, Default)]
pub struct UiInteractionState {
    pub wants_pointer_input: bool,
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct OrbitRig {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub damping: f32,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_pan: Vec3,
}

impl OrbitRig {
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(f32::EPSILON);
        Self {
            target,
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance)
                .clamp(-1.0, 1.0)
                .asin()
                .clamp(-PITCH_LIMIT, PITCH_LIMIT),
            distance,
            min_distance: 0.5,
            max_distance: 50.0,
            damping: 0.05,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_pan: Vec3::ZERO,
        }
    }

    pub fn direction(&self) -> Vec3 {
        Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        )
    }

    pub fn eye(&self) -> Vec3 {
        self.target + self.direction() * self.distance
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.target, Vec3::Y)
    }

    pub fn rotate_by_pixels(&mut self, delta: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.pending_yaw -= TAU * delta.x / height;
        self.pending_pitch += TAU * delta.y / height;
    }

    pub fn pan_by_pixels(&mut self, delta: Vec2, viewport_height: f32, fov: f32) {
        let height = viewport_height.max(1.0);
        let units_per_pixel = 2.0 * self.distance * (fov / 2.0).tan() / height;
        let direction = self.direction();
        let right = Vec3::Y.cross(direction).normalize_or(Vec3::X);
        let up = direction.cross(right).normalize_or(Vec3::Y);
        self.pending_pan += (-delta.x * right + delta.y * up) * units_per_pixel;
    }

    pub fn zoom_by_lines(&mut self, lines: f32) {
        self.distance =
            (self.distance * ZOOM_STEP.powf(lines)).clamp(self.min_distance, self.max_distance);
    }

    pub fn is_settled(&self) -> bool {
        self.pending_yaw.abs() < 1e-5
            && self.pending_pitch.abs() < 1e-5
            && self.pending_pan.length_squared() < 1e-10
    }

    pub fn update(&mut self, delta_secs: f32) {
        let frames = (delta_secs * 60.0).max(0.0);
        let blend = 1.0 - (1.0 - self.damping.clamp(0.0, 1.0)).powf(frames);

        let yaw_step = self.pending_yaw * blend;
        let pitch_step = self.pending_pitch * blend;
        let pan_step = self.pending_pan * blend;

        self.yaw += yaw_step;
        self.pitch = (self.pitch + pitch_step).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.target += pan_step;

        self.pending_yaw -= yaw_step;
        self.pending_pitch -= pitch_step;
        self.pending_pan -= pan_step;
    }
}

pub fn orbit_camera_system(
    time: Res<Time>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    ui_state: Res<UiInteractionState>,
    mut camera_query: Query<(&mut Transform, &mut OrbitRig, &Projection)>,
) {
    let Ok(window) = windows.single() else {
        return;
    };

    let viewport_height = window.height();
    let mouse_delta = mouse_motion.delta;
    let can_use_pointer = window.cursor_position().is_some() && !ui_state.wants_pointer_input;

    for (mut transform, mut rig, projection) in &mut camera_query {
        if can_use_pointer {
            if mouse_buttons.pressed(MouseButton::Left) && mouse_delta.length_squared() > 0.0 {
                rig.rotate_by_pixels(mouse_delta, viewport_height);
            }

            if mouse_buttons.pressed(MouseButton::Right) && mouse_delta.length_squared() > 0.0 {
                let fov = match projection {
                    Projection::Perspective(perspective) => perspective.fov,
                    _ => FRAC_PI_2,
                };
                rig.pan_by_pixels(mouse_delta, viewport_height, fov);
            }

            if mouse_scroll.delta.y.abs() > f32::EPSILON {
                rig.zoom_by_lines(mouse_scroll.delta.y);
            }
        }

        rig.update(time.delta_secs());
        *transform = rig.transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rig() -> OrbitRig {
        OrbitRig::looking_at(Vec3::new(6.0, 4.0, 8.0), Vec3::ZERO)
    }

    #[test]
    fn starts_where_the_camera_was_placed() {
        let eye = rig().eye();
        assert_relative_eq!(eye.x, 6.0, epsilon = 1e-4);
        assert_relative_eq!(eye.y, 4.0, epsilon = 1e-4);
        assert_relative_eq!(eye.z, 8.0, epsilon = 1e-4);
        assert!(rig().is_settled());
    }

    #[test]
    fn rotation_eases_towards_the_full_drag() {
        let mut rig = rig();
        let start_yaw = rig.yaw;
        rig.rotate_by_pixels(Vec2::new(-90.0, 0.0), 900.0);

        rig.update(1.0 / 60.0);
        let first_step = rig.yaw - start_yaw;
        assert_relative_eq!(first_step, TAU * 0.1 * 0.05, epsilon = 1e-5);

        for _ in 0..600 {
            rig.update(1.0 / 60.0);
        }
        assert_relative_eq!(rig.yaw - start_yaw, TAU * 0.1, epsilon = 1e-4);
        assert!(rig.is_settled());
    }

    #[test]
    fn damping_does_not_depend_on_frame_rate() {
        let mut fast = rig();
        let mut slow = rig();
        fast.rotate_by_pixels(Vec2::new(120.0, 40.0), 800.0);
        slow.rotate_by_pixels(Vec2::new(120.0, 40.0), 800.0);

        for _ in 0..120 {
            fast.update(1.0 / 120.0);
        }
        for _ in 0..30 {
            slow.update(1.0 / 30.0);
        }
        assert_relative_eq!(fast.yaw, slow.yaw, epsilon = 1e-4);
        assert_relative_eq!(fast.pitch, slow.pitch, epsilon = 1e-4);
    }

    #[test]
    fn zero_delta_time_does_not_move() {
        let mut rig = rig();
        let before = rig.clone();
        rig.rotate_by_pixels(Vec2::new(50.0, 50.0), 600.0);
        rig.update(0.0);
        assert_eq!(rig.yaw, before.yaw);
        assert_eq!(rig.pitch, before.pitch);
    }

    #[test]
    fn pitch_never_reaches_the_pole() {
        let mut rig = rig();
        rig.rotate_by_pixels(Vec2::new(0.0, 5_000.0), 600.0);
        for _ in 0..1_000 {
            rig.update(1.0 / 60.0);
        }
        assert!(rig.pitch <= PITCH_LIMIT);
        assert!(rig.transform().translation.is_finite());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut rig = rig();
        let start = rig.distance;
        rig.zoom_by_lines(1.0);
        assert_relative_eq!(rig.distance, start * ZOOM_STEP);

        rig.zoom_by_lines(500.0);
        assert_eq!(rig.distance, rig.min_distance);
        rig.zoom_by_lines(-500.0);
        assert_eq!(rig.distance, rig.max_distance);
    }

    #[test]
    fn panning_moves_target_sideways() {
        let mut rig = OrbitRig::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        rig.pan_by_pixels(Vec2::new(100.0, 0.0), 1000.0, 35f32.to_radians());
        for _ in 0..1_000 {
            rig.update(1.0 / 60.0);
        }
        assert!(rig.target.x < 0.0);
        assert_relative_eq!(rig.target.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(rig.target.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(rig.distance, 10.0, epsilon = 1e-5);
    }
}
