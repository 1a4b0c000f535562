use crate::showcase::config::{ConfigStore, DebugTuning};
use crate::showcase::ANIMATION_CROSSFADE;
use bevy::animation::transition::AnimationTransitions;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Component)]
pub struct Fox;

#[derive(Resource)]
pub struct FoxAssets {
    pub gltf: Handle<Gltf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationCatalog {
    names: Vec<String>,
    nodes: Vec<AnimationNodeIndex>,
}

impl AnimationCatalog {
    pub fn new(names: Vec<String>, nodes: Vec<AnimationNodeIndex>) -> Self {
        debug_assert_eq!(names.len(), nodes.len());
        Self { names, nodes }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn node(&self, name: &str) -> Option<AnimationNodeIndex> {
        self.index_of(name).map(|i| self.nodes[i])
    }

    pub fn resolve<'a>(&'a self, requested: Option<&str>) -> Option<&'a str> {
        requested
            .and_then(|name| self.index_of(name))
            .or((!self.names.is_empty()).then_some(0))
            .map(|i| self.names[i].as_str())
    }

    pub fn switch_target<'a>(
        &'a self,
        requested: Option<&str>,
        current: Option<&str>,
    ) -> Option<(&'a str, AnimationNodeIndex)> {
        let name = self.resolve(requested)?;
        if current == Some(name) {
            return None;
        }
        self.node(name).map(|node| (name, node))
    }
}

#[derive(Resource)]
pub struct FoxAnimations {
    pub catalog: AnimationCatalog,
    pub graph: Handle<AnimationGraph>,
    pub current: Option<String>,
}

pub fn ordered_clip_names<'a, H, I>(clips: &[H], named: I) -> Vec<String>
where
    H: PartialEq + 'a,
    I: IntoIterator<Item = (&'a str, &'a H)>,
{
    let named: Vec<(&str, &H)> = named.into_iter().collect();
    clips
        .iter()
        .enumerate()
        .map(|(i, clip)| {
            named
                .iter()
                .find(|(_, handle)| *handle == clip)
                .map(|(name, _)| name.to_string())
                .unwrap_or_else(|| format!("Animation{i}"))
        })
        .collect()
}

pub fn spawn_fox(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    store: Res<ConfigStore>,
) {
    let path = store.settings.fox_model.clone();
    commands.insert_resource(FoxAssets {
        gltf: asset_server.load(path.clone()),
    });
    commands.spawn((
        Fox,
        SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(path))),
        Transform::from_scale(Vec3::splat(store.settings.fox_scale)),
    ));
}

pub fn build_fox_animations(
    mut commands: Commands,
    fox: Res<FoxAssets>,
    gltfs: Res<Assets<Gltf>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    mut tuning: ResMut<DebugTuning>,
) {
    let Some(gltf) = gltfs.get(&fox.gltf) else {
        return;
    };

    let names = ordered_clip_names(
        &gltf.animations,
        gltf.named_animations
            .iter()
            .map(|(name, handle)| (name.as_ref(), handle)),
    );
    let (graph, nodes) = AnimationGraph::from_clips(gltf.animations.iter().cloned());
    let catalog = AnimationCatalog::new(names, nodes);

    if catalog.is_empty() {
        warn!("Fox model has no animations");
    } else {
        info!("Fox animations: {}", catalog.names().join(", "));
    }

    let initial = catalog.resolve(tuning.animation.as_deref()).map(str::to_string);
    if tuning.animation != initial {
        tuning.animation = initial;
    }

    commands.insert_resource(FoxAnimations {
        catalog,
        graph: graphs.add(graph),
        current: None,
    });
}

pub fn attach_fox_animations(
    mut commands: Commands,
    mut animations: ResMut<FoxAnimations>,
    tuning: Res<DebugTuning>,
    mut players: Query<(Entity, &mut AnimationPlayer), Without<AnimationGraphHandle>>,
) {
    for (entity, mut player) in &mut players {
        let mut transitions = AnimationTransitions::new();
        let requested = tuning.animation.as_deref();
        if let Some(node) = requested.and_then(|name| animations.catalog.node(name)) {
            transitions
                .play(&mut player, node, Duration::ZERO)
                .repeat()
                .set_speed(tuning.animation_speed);
            animations.current = requested.map(str::to_string);
        }

        commands
            .entity(entity)
            .insert((AnimationGraphHandle(animations.graph.clone()), transitions));
    }
}

pub fn sync_fox_animation(
    mut tuning: ResMut<DebugTuning>,
    mut animations: ResMut<FoxAnimations>,
    mut players: Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
) {
    if !tuning.is_changed() {
        return;
    }

    // A reloaded config may name a clip this model does not have.
    let resolved = animations
        .catalog
        .resolve(tuning.animation.as_deref())
        .map(str::to_string);
    if tuning.animation != resolved {
        if let Some(requested) = &tuning.animation {
            warn!("Unknown animation {requested}, playing {resolved:?}");
        }
        tuning.animation = resolved;
    }

    let switch_to = animations
        .catalog
        .switch_target(tuning.animation.as_deref(), animations.current.as_deref())
        .map(|(_, node)| node);

    for (mut player, mut transitions) in &mut players {
        if let Some(node) = switch_to {
            transitions
                .play(&mut player, node, ANIMATION_CROSSFADE)
                .repeat();
        }
        for (_, active) in player.playing_animations_mut() {
            active.set_speed(tuning.animation_speed);
        }
    }

    if switch_to.is_some() {
        animations.current = tuning.animation.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use pretty_assertions::assert_eq;

    fn catalog(names: &[&str]) -> AnimationCatalog {
        let mut graph = AnimationGraph::new();
        let nodes = names
            .iter()
            .map(|_| graph.add_clip(Handle::default(), 1.0, graph.root))
            .collect();
        AnimationCatalog::new(names.iter().map(|n| n.to_string()).collect(), nodes)
    }

    #[test]
    fn clip_names_follow_file_order() {
        let clips = [10, 20, 30];
        let named = [("Run", &clips[2]), ("Survey", &clips[0]), ("Walk", &clips[1])];
        assert_eq!(
            ordered_clip_names(&clips, named),
            vec!["Survey".to_string(), "Walk".to_string(), "Run".to_string()]
        );
    }

    #[test]
    fn unnamed_clips_get_positional_names() {
        let clips = [1, 2];
        let named = [("Walk", &clips[1])];
        assert_eq!(
            ordered_clip_names(&clips, named),
            vec!["Animation0".to_string(), "Walk".to_string()]
        );
    }

    #[test]
    fn resolve_prefers_requested_clip() {
        let catalog = catalog(&["Survey", "Walk", "Run"]);
        assert_eq!(catalog.resolve(Some("Run")), Some("Run"));
        assert_eq!(catalog.resolve(Some("Dance")), Some("Survey"));
        assert_eq!(catalog.resolve(None), Some("Survey"));
        assert_eq!(catalog.index_of("Walk"), Some(1));
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        let catalog = AnimationCatalog::default();
        assert!(catalog.is_empty());
        assert_eq!(catalog.resolve(Some("Run")), None);
        assert_eq!(catalog.node("Run"), None);
    }

    #[test]
    fn switch_target_falls_back_to_first_clip() {
        let catalog = catalog(&["Survey", "Walk"]);
        assert_eq!(
            catalog.switch_target(Some("Dance"), Some("Walk")),
            Some(("Survey", catalog.node("Survey").unwrap()))
        );
        assert_eq!(catalog.switch_target(Some("Dance"), Some("Survey")), None);
        assert_eq!(catalog.switch_target(Some("Walk"), Some("Walk")), None);
        assert_eq!(AnimationCatalog::default().switch_target(Some("Walk"), None), None);
    }

    #[test]
    fn reloaded_unknown_clip_is_replaced_by_first() {
        let mut world = World::new();
        world.insert_resource(DebugTuning {
            animation: Some("Dance".to_string()),
            ..DebugTuning::default()
        });
        world.insert_resource(FoxAnimations {
            catalog: catalog(&["Survey", "Walk"]),
            graph: Handle::default(),
            current: Some("Walk".to_string()),
        });

        world.run_system_once(sync_fox_animation).unwrap();

        assert_eq!(
            world.resource::<DebugTuning>().animation.as_deref(),
            Some("Survey")
        );
        assert_eq!(
            world.resource::<FoxAnimations>().current.as_deref(),
            Some("Survey")
        );
    }

    #[test]
    fn nodes_line_up_with_names() {
        let catalog = catalog(&["Survey", "Walk"]);
        assert_ne!(catalog.node("Survey"), catalog.node("Walk"));
        assert!(catalog.node("Walk").is_some());
    }
}
