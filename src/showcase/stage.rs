use crate::showcase::camera::OrbitRig;
use crate::showcase::config::{ConfigStore, DebugTuning};
use crate::showcase::curved_text::{GlyphFont, render_curved_text};
use crate::showcase::environment::{env_map_luminance, load_cube_faces};
use crate::showcase::{
    CAMERA_FAR, CAMERA_FOV_DEG, CAMERA_NEAR, CAMERA_START, GROUND_TEXT_LIFT, LIGHT_LUX_PER_UNIT,
    SHADOW_FAR, SHADOW_MAP_SIZE,
};
use bevy::asset::RenderAssetUsages;
use bevy::camera::{Exposure, RenderTarget};
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::image::{
    ImageAddressMode, ImageLoaderSettings, ImageSampler, ImageSamplerDescriptor,
};
use bevy::light::{
    CascadeShadowConfigBuilder, DirectionalLightShadowMap, GeneratedEnvironmentMapLight,
    NotShadowCaster, NotShadowReceiver,
};
use bevy::math::Affine2;
use bevy::pbr::ShadowFilteringMethod;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat, TextureUsages};
use bevy::window::PrimaryWindow;
use image::DynamicImage;
use std::f32::consts::FRAC_PI_2;
use std::path::Path;
use tracing::{info, warn};

#[derive(Component)]
pub struct Floor;

#[derive(Component)]
pub struct GroundText;

#[derive(Component)]
pub struct KeyLight;

#[derive(Component)]
pub struct MainCamera;

// Offscreen image the main camera draws into, shown full-window by the overlay.
#[derive(Resource)]
pub struct SceneTarget {
    pub image: Handle<Image>,
}

pub fn exposure_ev100(exposure: f32) -> f32 {
    Exposure::default().ev100 - exposure.max(0.001).log2()
}

pub fn light_illuminance(intensity: f32) -> f32 {
    intensity.max(0.0) * LIGHT_LUX_PER_UNIT
}

pub fn render_target_size(logical: Vec2, scale_factor: f32, max_pixel_ratio: f32) -> UVec2 {
    let ratio = scale_factor.min(max_pixel_ratio);
    (logical * ratio).round().max(Vec2::ONE).as_uvec2()
}

fn scene_target_image(size: UVec2) -> Image {
    let mut image = Image::new_fill(
        Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[0, 0, 0, 0],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    image.texture_descriptor.usage = TextureUsages::RENDER_ATTACHMENT
        | TextureUsages::TEXTURE_BINDING
        | TextureUsages::COPY_DST;
    image
}

fn window_target_size(window: &Window, max_pixel_ratio: f32) -> UVec2 {
    render_target_size(
        Vec2::new(window.width(), window.height()),
        window.scale_factor(),
        max_pixel_ratio,
    )
}

fn repeat_sampler() -> ImageSampler {
    ImageSampler::Descriptor(ImageSamplerDescriptor {
        address_mode_u: ImageAddressMode::Repeat,
        address_mode_v: ImageAddressMode::Repeat,
        ..ImageSamplerDescriptor::linear()
    })
}

pub fn setup_floor(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    store: Res<ConfigStore>,
) {
    let settings = &store.settings;
    let color_texture: Handle<Image> = asset_server.load_with_settings(
        settings.floor_color_texture.clone(),
        |s: &mut ImageLoaderSettings| s.sampler = repeat_sampler(),
    );
    let normal_texture: Handle<Image> = asset_server.load_with_settings(
        settings.floor_normal_texture.clone(),
        |s: &mut ImageLoaderSettings| {
            s.sampler = repeat_sampler();
            s.is_srgb = false;
        },
    );

    let mesh = Circle::new(settings.floor_radius)
        .mesh()
        .resolution(settings.floor_segments.max(3))
        .build();
    let mesh = match mesh.clone().with_generated_tangents() {
        Ok(with_tangents) => with_tangents,
        Err(err) => {
            warn!("Floor normal map disabled, no tangents: {err}");
            mesh
        }
    };

    let material = materials.add(StandardMaterial {
        base_color_texture: Some(color_texture),
        normal_map_texture: Some(normal_texture),
        uv_transform: Affine2::from_scale(Vec2::splat(settings.floor_texture_repeat)),
        perceptual_roughness: 1.0,
        metallic: 0.0,
        ..default()
    });

    commands.spawn((
        Floor,
        Mesh3d(meshes.add(mesh)),
        MeshMaterial3d(material),
        Transform::from_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
    ));
}

pub fn setup_ground_text(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    store: Res<ConfigStore>,
) {
    let settings = &store.settings;
    let style = match settings.curved_text_style() {
        Ok(style) => style,
        Err(err) => {
            warn!("Ground text skipped: {err}");
            return;
        }
    };

    let font = match GlyphFont::load(Path::new(&settings.ground_text_font), style.font_px) {
        Ok(font) => font,
        Err(err) => {
            warn!("Ground text skipped: {err}");
            return;
        }
    };

    let rendered = match render_curved_text(&settings.ground_text, &font, &style) {
        Ok(rendered) => rendered,
        Err(err) => {
            warn!("Ground text skipped: {err}");
            return;
        }
    };

    let mut texture = Image::from_dynamic(
        DynamicImage::ImageRgba8(rendered),
        true,
        RenderAssetUsages::RENDER_WORLD,
    );
    texture.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
        anisotropy_clamp: 4,
        ..ImageSamplerDescriptor::linear()
    });

    let material = materials.add(StandardMaterial {
        base_color_texture: Some(images.add(texture)),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        depth_bias: 1.0,
        ..default()
    });

    // Same footprint as the floor so the arc follows its rim.
    let diameter = settings.floor_radius * 2.0;
    commands.spawn((
        GroundText,
        Mesh3d(meshes.add(Plane3d::default().mesh().size(diameter, diameter))),
        MeshMaterial3d(material),
        Transform::from_xyz(0.0, GROUND_TEXT_LIFT, 0.0),
        NotShadowCaster,
        NotShadowReceiver,
    ));
    info!("Ground text rendered: {}", settings.ground_text);
}

pub fn setup_scene_target(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    store: Res<ConfigStore>,
) {
    let settings = &store.settings;
    let size = match windows.single() {
        Ok(window) => window_target_size(window, settings.max_pixel_ratio),
        Err(_) => UVec2::new(settings.window_width, settings.window_height).max(UVec2::ONE),
    };
    commands.insert_resource(SceneTarget {
        image: images.add(scene_target_image(size)),
    });
}

pub fn setup_light_and_camera(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    store: Res<ConfigStore>,
    tuning: Res<DebugTuning>,
    target: Res<SceneTarget>,
) {
    commands.insert_resource(DirectionalLightShadowMap {
        size: SHADOW_MAP_SIZE,
    });

    commands.spawn((
        KeyLight,
        DirectionalLight {
            color: Color::WHITE,
            illuminance: light_illuminance(tuning.light_intensity),
            shadows_enabled: true,
            shadow_normal_bias: 0.05,
            ..default()
        },
        CascadeShadowConfigBuilder {
            num_cascades: 1,
            maximum_distance: SHADOW_FAR,
            ..default()
        }
        .build(),
        Transform::from_translation(tuning.light_position_vec3()).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let rig = OrbitRig::looking_at(CAMERA_START, Vec3::ZERO);
    let mut camera = commands.spawn((
        MainCamera,
        Camera3d::default(),
        RenderTarget::Image(target.image.clone().into()),
        Projection::Perspective(PerspectiveProjection {
            fov: CAMERA_FOV_DEG.to_radians(),
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            ..default()
        }),
        rig.transform(),
        rig,
        Msaa::Sample4,
        Tonemapping::ReinhardLuminance,
        Exposure {
            ev100: exposure_ev100(tuning.exposure),
        },
        ShadowFilteringMethod::Gaussian,
    ));

    match load_cube_faces(Path::new(&store.settings.environment_map_dir)) {
        Ok(faces) => {
            camera.insert(GeneratedEnvironmentMapLight {
                environment_map: images.add(faces.into_image()),
                intensity: env_map_luminance(tuning.env_map_intensity),
                ..default()
            });
        }
        Err(err) => warn!("Environment lighting disabled: {err}"),
    }
}

pub fn apply_tuning(
    tuning: Res<DebugTuning>,
    mut lights: Query<(&mut DirectionalLight, &mut Transform), With<KeyLight>>,
    mut cameras: Query<
        (&mut Exposure, Option<&mut GeneratedEnvironmentMapLight>),
        With<MainCamera>,
    >,
) {
    if !tuning.is_changed() {
        return;
    }

    for (mut light, mut transform) in &mut lights {
        light.illuminance = light_illuminance(tuning.light_intensity);
        *transform = Transform::from_translation(tuning.light_position_vec3())
            .looking_at(Vec3::ZERO, Vec3::Y);
    }

    for (mut exposure, environment) in &mut cameras {
        exposure.ev100 = exposure_ev100(tuning.exposure);
        if let Some(mut environment) = environment {
            environment.intensity = env_map_luminance(tuning.env_map_intensity);
        }
    }
}

// Runs on window creation, resize and scale-factor changes alike.
pub fn fit_scene_target(
    windows: Query<&Window, (With<PrimaryWindow>, Changed<Window>)>,
    target: Res<SceneTarget>,
    store: Res<ConfigStore>,
    mut images: ResMut<Assets<Image>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = window_target_size(window, store.settings.max_pixel_ratio);
    let Some(mut image) = images.get_mut(&target.image) else {
        return;
    };

    let current = image.texture_descriptor.size;
    if current.width != size.x || current.height != size.y {
        image.resize(Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        });
        info!(
            "Scene resolution {}x{} (scale factor {:.2})",
            size.x,
            size.y,
            window.scale_factor()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bevy::ecs::system::RunSystemOnce;
    use bevy::window::WindowResolution;
    use rstest::rstest;

    #[test]
    fn unit_exposure_is_engine_default() {
        assert_relative_eq!(exposure_ev100(1.0), Exposure::default().ev100);
    }

    #[test]
    fn brighter_exposure_lowers_ev100() {
        assert!(exposure_ev100(1.75) < exposure_ev100(1.0));
        assert_relative_eq!(
            exposure_ev100(2.0),
            Exposure::default().ev100 - 1.0,
            epsilon = 1e-5
        );
        assert!(exposure_ev100(0.0).is_finite());
    }

    #[rstest]
    #[case(1.0, UVec2::new(1600, 900))]
    #[case(1.5, UVec2::new(2400, 1350))]
    #[case(2.0, UVec2::new(3200, 1800))]
    #[case(3.0, UVec2::new(3200, 1800))]
    fn pixel_ratio_is_capped(#[case] scale_factor: f32, #[case] expected: UVec2) {
        assert_eq!(
            render_target_size(Vec2::new(1600.0, 900.0), scale_factor, 2.0),
            expected
        );
    }

    #[test]
    fn minimized_window_keeps_a_pixel() {
        assert_eq!(render_target_size(Vec2::ZERO, 2.0, 2.0), UVec2::ONE);
    }

    #[test]
    fn scene_target_follows_high_dpi_window() {
        let mut world = World::new();
        world.init_resource::<Assets<Image>>();
        world.insert_resource(ConfigStore::default());
        let image = world
            .resource_mut::<Assets<Image>>()
            .add(scene_target_image(UVec2::ONE));
        world.insert_resource(SceneTarget {
            image: image.clone(),
        });
        world.spawn((
            Window {
                resolution: WindowResolution::new(800, 600).with_scale_factor_override(3.0),
                ..default()
            },
            PrimaryWindow,
        ));

        world.run_system_once(fit_scene_target).unwrap();

        let images = world.resource::<Assets<Image>>();
        let size = images.get(&image).unwrap().texture_descriptor.size;
        // 800x600 physical at 3x is 266.7x200 logical, drawn at 2x.
        assert_eq!((size.width, size.height), (533, 400));
    }

    #[test]
    fn light_intensity_maps_to_lux() {
        assert_relative_eq!(light_illuminance(4.0), 4.0 * LIGHT_LUX_PER_UNIT);
        assert_eq!(light_illuminance(-2.0), 0.0);
    }
}
