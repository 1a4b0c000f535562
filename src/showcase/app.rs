use crate::showcase::camera::{UiInteractionState, orbit_camera_system};
use crate::showcase::cli::CliOptions;
use crate::showcase::config::{ConfigStore, load_config};
use crate::showcase::fox::{
    FoxAnimations, attach_fox_animations, build_fox_animations, spawn_fox, sync_fox_animation,
};
use crate::showcase::stage::{
    SceneTarget, apply_tuning, fit_scene_target, setup_floor, setup_ground_text,
    setup_light_and_camera, setup_scene_target,
};
use crate::showcase::ui::{PanelState, debug_panel_system};
use crate::showcase::CLEAR_COLOR_HEX;
use bevy::camera::visibility::RenderLayers;
use bevy::diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::window::{PresentMode, WindowResolution};
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass, PrimaryEguiContext};
use std::time::Duration;
use tracing::info;

// Nothing in the world lives on this layer, so the overlay only draws UI.
const OVERLAY_LAYER: usize = 31;

pub fn run(options: CliOptions) -> anyhow::Result<()> {
    let persisted = load_config(&options.config_path);
    let store = ConfigStore::new(options.config_path, persisted.settings)
        .with_overrides(options.ground_text, options.diagnostics);
    let settings = store.settings.clone();

    let clear_color = Srgba::hex(CLEAR_COLOR_HEX)?;
    let log_diagnostics = settings.log_diagnostics;

    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: settings.window_title.clone(),
            resolution: WindowResolution::new(settings.window_width, settings.window_height),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    }))
    .add_plugins(EguiPlugin::default())
    .insert_resource(ClearColor(clear_color.into()))
    .insert_resource(persisted.tuning)
    .insert_resource(store)
    .insert_resource(UiInteractionState::default())
    .insert_resource(PanelState::default())
    .add_systems(
        Startup,
        (
            setup_scene_target,
            (
                setup_light_and_camera,
                setup_floor,
                setup_ground_text,
                spawn_fox,
                setup_overlay_camera,
                announce_config,
            ),
        )
            .chain(),
    )
    .add_systems(
        Update,
        (
            build_fox_animations.run_if(not(resource_exists::<FoxAnimations>)),
            (attach_fox_animations, sync_fox_animation)
                .chain()
                .run_if(resource_exists::<FoxAnimations>),
        )
            .chain(),
    )
    .add_systems(Update, (orbit_camera_system, apply_tuning, fit_scene_target))
    .add_systems(EguiPrimaryContextPass, debug_panel_system);

    if log_diagnostics {
        app.add_plugins((
            FrameTimeDiagnosticsPlugin::default(),
            LogDiagnosticsPlugin {
                wait_duration: Duration::from_secs(2),
                ..default()
            },
        ));
    }

    app.run();
    Ok(())
}

// The only window camera: shows the scene image under the debug panel.
fn setup_overlay_camera(mut commands: Commands, target: Res<SceneTarget>) {
    let overlay = commands
        .spawn((
            Camera2d,
            Camera {
                order: 1,
                ..default()
            },
            RenderLayers::layer(OVERLAY_LAYER),
            PrimaryEguiContext,
        ))
        .id();

    commands.spawn((
        ImageNode::new(target.image.clone()),
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        UiTargetCamera(overlay),
    ));
}

fn announce_config(store: Res<ConfigStore>) {
    info!(
        "Scene config: {} (ground text \"{}\")",
        store.path.display(),
        store.settings.ground_text
    );
}
