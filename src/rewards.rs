//! Floating emoji that can be clicked for points.

use std::{collections::HashSet, time::Duration};

use bevy::prelude::*;
use rand::Rng;
use uuid::Uuid;

use crate::page::{show_thank_you, RewardCollected};
use crate::theme::EMOJI_FONT;

pub const REWARD_SYMBOLS: [&str; 5] = ["💎", "⭐", "💖", "🍔", "🍀"];
pub const REWARD_FLOOR: usize = 6;
pub const REWARD_CEILING: usize = 20;
pub const SPAWN_INTERVAL: Duration = Duration::from_millis(2000);
pub const TRIM_INTERVAL: Duration = Duration::from_millis(8000);

const TOKEN_SIZE: f32 = 44.0;

#[derive(Clone, Debug, PartialEq)]
pub struct RewardToken {
    pub id: Uuid,
    pub symbol: &'static str,
    pub horizontal_percent: f32,
    pub point_value: u32,
}

impl RewardToken {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: REWARD_SYMBOLS[rng.random_range(0..REWARD_SYMBOLS.len())],
            horizontal_percent: rng.random_range(0.0..100.0),
            point_value: rng.random_range(1..=10),
        }
    }
}

/// Live tokens, oldest first.
#[derive(Resource, Debug, Default)]
pub struct RewardField {
    tokens: Vec<RewardToken>,
}

impl RewardField {
    /// The population a freshly mounted page starts with.
    pub fn seeded<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            tokens: (0..REWARD_FLOOR).map(|_| RewardToken::random(rng)).collect(),
        }
    }

    pub fn tokens(&self) -> &[RewardToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Adds one token unless the ceiling is reached.
    pub fn spawn_tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.tokens.len() >= REWARD_CEILING {
            return false;
        }
        self.tokens.push(RewardToken::random(rng));
        true
    }

    /// Keeps the newest `REWARD_FLOOR` tokens and returns the discarded ones.
    pub fn trim(&mut self) -> Vec<RewardToken> {
        if self.tokens.len() <= REWARD_FLOOR {
            return Vec::new();
        }
        let excess = self.tokens.len() - REWARD_FLOOR;
        self.tokens.drain(..excess).collect()
    }

    pub fn collect(&mut self, id: Uuid) -> Option<RewardToken> {
        let index = self.tokens.iter().position(|t| t.id == id)?;
        Some(self.tokens.remove(index))
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}

/// Present only while the game layer is mounted.
#[derive(Resource)]
pub struct RewardTimers {
    spawn: Timer,
    trim: Timer,
}

impl Default for RewardTimers {
    fn default() -> Self {
        Self {
            spawn: Timer::new(SPAWN_INTERVAL, TimerMode::Repeating),
            trim: Timer::new(TRIM_INTERVAL, TimerMode::Repeating),
        }
    }
}

#[derive(Component)]
pub struct RewardLayer;

#[derive(Component)]
pub struct RewardView {
    id: Uuid,
    born: f32,
    rise_speed: f32,
}

impl RewardView {
    pub fn new(id: Uuid, born: f32, rise_speed: f32) -> Self {
        Self {
            id,
            born,
            rise_speed,
        }
    }
}

pub struct RewardGamePlugin;

impl Plugin for RewardGamePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, mount_rewards).add_systems(
            Update,
            (
                tick_reward_timers,
                collect_rewards,
                sync_reward_views,
                float_rewards,
            )
                .chain()
                // The teardown despawns the whole layer, views included
                .before(show_thank_you),
        );
    }
}

fn mount_rewards(mut cmd: Commands) {
    cmd.insert_resource(RewardField::seeded(&mut rand::rng()));
    cmd.insert_resource(RewardTimers::default());
}

pub fn tick_reward_timers(
    time: Res<Time>,
    timers: Option<ResMut<RewardTimers>>,
    mut field: ResMut<RewardField>,
) {
    let Some(mut timers) = timers else { return };
    let mut rng = rand::rng();

    timers.spawn.tick(time.delta());
    for _ in 0..timers.spawn.times_finished_this_tick() {
        field.spawn_tick(&mut rng);
    }

    timers.trim.tick(time.delta());
    if timers.trim.just_finished() {
        let dropped = field.trim();
        if !dropped.is_empty() {
            debug!("Trimmed {} reward tokens", dropped.len());
        }
    }
}

pub fn collect_rewards(
    clicks: Query<(&Interaction, &RewardView), Changed<Interaction>>,
    mut field: ResMut<RewardField>,
    mut collected: EventWriter<RewardCollected>,
) {
    for (interaction, view) in clicks.iter() {
        if *interaction != Interaction::Pressed {
            continue;
        }
        if let Some(token) = field.collect(view.id) {
            collected.send(RewardCollected {
                value: token.point_value,
            });
        }
    }
}

/// Spawns views for new tokens and despawns views whose token is gone.
fn sync_reward_views(
    mut cmd: Commands,
    field: Res<RewardField>,
    views: Query<(Entity, &RewardView)>,
    layer: Query<Entity, With<RewardLayer>>,
    time: Res<Time>,
    asset_server: Res<AssetServer>,
) {
    // Gone once the page completes
    let Ok(layer) = layer.get_single() else {
        return;
    };
    if !field.is_changed() {
        return;
    }
    let live: HashSet<Uuid> = field.tokens().iter().map(|t| t.id).collect();
    let mut shown = HashSet::new();
    for (entity, view) in views.iter() {
        if live.contains(&view.id) {
            shown.insert(view.id);
        } else {
            cmd.entity(entity).despawn_recursive();
        }
    }

    let font = asset_server.load(EMOJI_FONT);
    let mut rng = rand::rng();
    for token in field.tokens().iter().filter(|t| !shown.contains(&t.id)) {
        cmd.entity(layer).with_children(|parent| {
            parent
                .spawn((
                    Button,
                    Node {
                        position_type: PositionType::Absolute,
                        left: Val::Percent(token.horizontal_percent),
                        top: Val::Percent(100.0),
                        width: Val::Px(TOKEN_SIZE),
                        height: Val::Px(TOKEN_SIZE),
                        justify_content: JustifyContent::Center,
                        align_items: AlignItems::Center,
                        ..default()
                    },
                    RewardView::new(
                        token.id,
                        time.elapsed_secs(),
                        rng.random_range(4.0..11.0),
                    ),
                ))
                .with_children(|button| {
                    button.spawn((
                        Text::new(token.symbol),
                        TextFont {
                            font: font.clone(),
                            font_size: 30.0,
                            ..default()
                        },
                    ));
                });
        });
    }
}

fn float_rewards(time: Res<Time>, mut views: Query<(&RewardView, &mut Node)>) {
    let now = time.elapsed_secs();
    for (view, mut node) in views.iter_mut() {
        let age = now - view.born;
        // Rise from the bottom edge, wrap after leaving the top
        let travel = (age * view.rise_speed) % 120.0;
        let sway = (age * 1.5 + view.rise_speed).sin() * 0.4;
        node.top = Val::Percent(100.0 - travel);
        node.margin.left = Val::Px(sway * TOKEN_SIZE);
    }
}
