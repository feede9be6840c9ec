//! The question screen and the thank-you screen.

use std::time::Duration;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::PageConfig;
use crate::persistence::{Persistence, Settled};
use crate::position::{next_position, DECLINE_PADDING};
use crate::rewards::{RewardField, RewardLayer, RewardTimers};
use crate::session::ScoreSession;
use crate::theme::{Palette, EMOJI_FONT, PLUMBOB_GREEN, TEXT_FONT};

/// Pause between the answer being stored and the thank-you screen.
pub const COMPLETION_DELAY: Duration = Duration::from_millis(800);

const ACCEPT_LABEL: &str = "Sí";
const SUBMITTING_LABEL: &str = "...";
const DECLINE_LABEL: &str = "No";
const THANKS_HEADING: &str = "¡Gracias!";
const THANKS_BODY: &str = "Yo sabía que dirías que sí";

// Events
#[derive(Event)]
pub struct DodgeTriggered;

#[derive(Event)]
pub struct AcceptClicked;

#[derive(Event)]
pub struct RewardCollected {
    pub value: u32,
}

/// Tells the soundtrack to swap to the success track.
#[derive(Event)]
pub struct SuccessCue;

#[derive(Resource, Default)]
pub struct CompletionDelay(Option<Timer>);

// Components
#[derive(Component)]
pub struct PageRoot;

/// Everything torn down when the page completes.
#[derive(Component)]
pub struct GameLayer;

#[derive(Component)]
pub struct AcceptButton;

#[derive(Component)]
struct AcceptLabel;

#[derive(Component)]
pub struct DeclineButton;

#[derive(Component)]
struct ScoreBadge;

#[derive(Component)]
pub struct ThankYouView;

#[derive(Component)]
pub struct FinalScore;

#[derive(Component)]
struct Pulse {
    speed: f32,
}

pub struct PagePlugin;

impl Plugin for PagePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScoreSession>()
            .init_resource::<CompletionDelay>()
            .add_event::<DodgeTriggered>()
            .add_event::<AcceptClicked>()
            .add_event::<RewardCollected>()
            .add_event::<SuccessCue>()
            .add_systems(Startup, setup_page)
            .add_systems(
                Update,
                (
                    detect_decline_hover,
                    detect_accept_click,
                    handle_dodges,
                    handle_accept,
                    handle_rewards,
                    apply_settled,
                    tick_completion,
                    show_thank_you,
                    place_decline_button,
                    update_accept_label,
                    update_score_badge,
                    animate_pulse,
                )
                    .chain(),
            );
    }
}

fn setup_page(mut cmd: Commands, asset_server: Res<AssetServer>, config: Res<PageConfig>) {
    cmd.spawn(Camera2d);

    let palette = config.theme.palette();
    let text_font = asset_server.load(TEXT_FONT);
    let emoji_font = asset_server.load(EMOJI_FONT);

    cmd.spawn((
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        BackgroundColor(palette.background),
        PageRoot,
    ))
    .with_children(|root| {
        root.spawn((full_screen_layer(), GameLayer))
            .with_children(|layer| {
                layer
                    .spawn((card_node(), BackgroundColor(palette.card), BorderRadius::all(Val::Px(16.0))))
                    .with_children(|card| {
                        card.spawn((
                            Text::new(config.title.clone()),
                            TextFont {
                                font: text_font.clone(),
                                font_size: 40.0,
                                ..default()
                            },
                            TextColor(palette.title),
                        ));
                        card.spawn((
                            Text::new(config.question.clone()),
                            TextFont {
                                font: text_font.clone(),
                                font_size: 18.0,
                                ..default()
                            },
                            TextColor(palette.body),
                            Node {
                                margin: UiRect::bottom(Val::Px(16.0)),
                                ..default()
                            },
                        ));
                        card.spawn(Node {
                            column_gap: Val::Px(16.0),
                            align_items: AlignItems::Center,
                            ..default()
                        })
                        .with_children(|row| {
                            spawn_accept_button(row, &palette, text_font.clone());
                            spawn_decline_button(row, &palette, text_font.clone());
                        });
                    });

                if config.has_reward_game {
                    layer.spawn((full_screen_layer(), RewardLayer));
                    layer
                        .spawn((
                            Node {
                                position_type: PositionType::Absolute,
                                top: Val::Px(16.0),
                                right: Val::Px(16.0),
                                padding: UiRect::axes(Val::Px(16.0), Val::Px(8.0)),
                                ..default()
                            },
                            BackgroundColor(palette.badge),
                            BorderRadius::MAX,
                        ))
                        .with_children(|badge| {
                            badge.spawn((
                                Text::new(score_text(0)),
                                TextFont {
                                    font: emoji_font.clone(),
                                    font_size: 22.0,
                                    ..default()
                                },
                                TextColor(palette.title),
                                ScoreBadge,
                            ));
                        });
                }
            });
    });
}

fn full_screen_layer() -> Node {
    Node {
        position_type: PositionType::Absolute,
        width: Val::Percent(100.0),
        height: Val::Percent(100.0),
        justify_content: JustifyContent::Center,
        align_items: AlignItems::Center,
        ..default()
    }
}

fn card_node() -> Node {
    Node {
        width: Val::Px(384.0),
        flex_direction: FlexDirection::Column,
        align_items: AlignItems::Center,
        padding: UiRect::all(Val::Px(40.0)),
        row_gap: Val::Px(24.0),
        ..default()
    }
}

fn spawn_accept_button(row: &mut ChildBuilder, palette: &Palette, font: Handle<Font>) {
    row.spawn((
        Button,
        Node {
            width: Val::Px(96.0),
            height: Val::Px(40.0),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        BackgroundColor(palette.accept),
        BorderRadius::MAX,
        AcceptButton,
    ))
    .with_children(|button| {
        button.spawn((
            Text::new(ACCEPT_LABEL),
            TextFont {
                font,
                font_size: 14.0,
                ..default()
            },
            TextColor(palette.accept_text),
            AcceptLabel,
        ));
    });
}

fn spawn_decline_button(row: &mut ChildBuilder, palette: &Palette, font: Handle<Font>) {
    row.spawn((
        Button,
        Node {
            width: Val::Px(DECLINE_PADDING.x),
            height: Val::Px(DECLINE_PADDING.y),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        BackgroundColor(palette.decline),
        BorderRadius::MAX,
        DeclineButton,
    ))
    .with_children(|button| {
        spawn_plumbob(button, -30.0);
        button.spawn((
            Text::new(DECLINE_LABEL),
            TextFont {
                font,
                font_size: 14.0,
                ..default()
            },
            TextColor(palette.decline_text),
        ));
    });
}

/// The little green diamond hovering over its parent.
fn spawn_plumbob(parent: &mut ChildBuilder, top: f32) {
    parent.spawn((
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(top),
            width: Val::Px(16.0),
            height: Val::Px(16.0),
            ..default()
        },
        BackgroundColor(PLUMBOB_GREEN),
        Transform::from_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_4)),
        Pulse { speed: 3.0 },
    ));
}

fn score_text(points: u32) -> String {
    format!("💎 {points}")
}

// Hover, click and touch all land here; the button is not meant to be pressable
fn detect_decline_hover(
    buttons: Query<&Interaction, (Changed<Interaction>, With<DeclineButton>)>,
    mut dodges: EventWriter<DodgeTriggered>,
) {
    for interaction in buttons.iter() {
        if matches!(interaction, Interaction::Hovered | Interaction::Pressed) {
            dodges.send(DodgeTriggered);
        }
    }
}

fn detect_accept_click(
    buttons: Query<&Interaction, (Changed<Interaction>, With<AcceptButton>)>,
    mut accepts: EventWriter<AcceptClicked>,
) {
    for interaction in buttons.iter() {
        if *interaction == Interaction::Pressed {
            accepts.send(AcceptClicked);
        }
    }
}

pub fn handle_dodges(
    mut dodges: EventReader<DodgeTriggered>,
    mut session: ResMut<ScoreSession>,
    windows: Query<&Window, With<PrimaryWindow>>,
    persistence: Res<Persistence>,
) {
    for _ in dodges.read() {
        let Some(count) = session.begin_dodge() else {
            continue;
        };
        // Without a window there is nowhere to jump to; the count still stands
        if let Ok(window) = windows.get_single() {
            let viewport = Vec2::new(window.width(), window.height());
            session.position = Some(next_position(
                session.position,
                viewport,
                DECLINE_PADDING,
                &mut rand::rng(),
            ));
        }
        persistence.record_dodge(count, session.points);
    }
}

pub fn handle_accept(
    mut accepts: EventReader<AcceptClicked>,
    mut session: ResMut<ScoreSession>,
    persistence: Res<Persistence>,
) {
    for _ in accepts.read() {
        if let Some(snapshot) = session.begin_accept() {
            info!(
                "Answer accepted after {} dodges with {} points",
                snapshot.dodge_count, snapshot.points
            );
            persistence.record_acceptance(snapshot.dodge_count, snapshot.points);
        }
    }
}

pub fn handle_rewards(
    mut collected: EventReader<RewardCollected>,
    mut session: ResMut<ScoreSession>,
    persistence: Res<Persistence>,
) {
    for reward in collected.read() {
        // Optimistic: a failed write leaves the local score as it is
        if let Some(points) = session.award(reward.value) {
            persistence.record_reward(points);
        }
    }
}

pub fn apply_settled(
    persistence: Res<Persistence>,
    mut session: ResMut<ScoreSession>,
    mut delay: ResMut<CompletionDelay>,
) {
    for settled in persistence.drain_settled() {
        match settled {
            Settled::Dodge => session.finish_dodge(),
            Settled::Acceptance => {
                if session.is_submitting() && delay.0.is_none() {
                    delay.0 = Some(Timer::new(COMPLETION_DELAY, TimerMode::Once));
                }
            }
        }
    }
}

pub fn tick_completion(
    time: Res<Time>,
    mut delay: ResMut<CompletionDelay>,
    mut session: ResMut<ScoreSession>,
    config: Res<PageConfig>,
    mut cues: EventWriter<SuccessCue>,
) {
    let Some(timer) = delay.0.as_mut() else {
        return;
    };
    if !timer.tick(time.delta()).finished() {
        return;
    }
    delay.0 = None;
    if session.complete() && config.has_audio {
        cues.send(SuccessCue);
    }
}

/// Unmounts the game layer (reward timers included) and shows the thanks.
pub fn show_thank_you(
    mut cmd: Commands,
    session: Res<ScoreSession>,
    config: Res<PageConfig>,
    game_layers: Query<Entity, With<GameLayer>>,
    roots: Query<Entity, With<PageRoot>>,
    shown: Query<(), With<ThankYouView>>,
    fields: Option<ResMut<RewardField>>,
    asset_server: Res<AssetServer>,
) {
    if !session.is_completed() || !shown.is_empty() {
        return;
    }
    for layer in game_layers.iter() {
        cmd.entity(layer).despawn_recursive();
    }
    cmd.remove_resource::<RewardTimers>();
    if let Some(mut field) = fields {
        field.clear();
    }

    let Ok(root) = roots.get_single() else {
        return;
    };
    let palette = config.theme.palette();
    let text_font = asset_server.load(TEXT_FONT);
    let emoji_font = asset_server.load(EMOJI_FONT);
    let final_points = session.points;
    let has_reward_game = config.has_reward_game;

    cmd.entity(root).with_children(|root| {
        root.spawn((
            card_node(),
            BackgroundColor(palette.card),
            BorderRadius::all(Val::Px(16.0)),
            ThankYouView,
        ))
        .with_children(|card| {
            card.spawn(Node {
                justify_content: JustifyContent::Center,
                margin: UiRect::top(Val::Px(24.0)),
                ..default()
            })
            .with_children(|heart| {
                spawn_plumbob(heart, -34.0);
                heart.spawn((
                    Text::new("❤"),
                    TextFont {
                        font: emoji_font.clone(),
                        font_size: 48.0,
                        ..default()
                    },
                    TextColor(palette.title),
                ));
            });
            card.spawn((
                Text::new(THANKS_HEADING),
                TextFont {
                    font: text_font.clone(),
                    font_size: 26.0,
                    ..default()
                },
                TextColor(palette.title),
            ));
            card.spawn((
                Text::new(THANKS_BODY),
                TextFont {
                    font: text_font.clone(),
                    font_size: 16.0,
                    ..default()
                },
                TextColor(palette.body),
            ));
            if has_reward_game {
                card.spawn((
                    Text::new(final_points.to_string()),
                    TextFont {
                        font: text_font.clone(),
                        font_size: 36.0,
                        ..default()
                    },
                    TextColor(palette.accent),
                    FinalScore,
                ));
            }
            card.spawn((
                Text::new(config.farewell.clone()),
                TextFont {
                    font: text_font.clone(),
                    font_size: 13.0,
                    ..default()
                },
                TextColor(palette.faint),
            ));
        });
    });
}

/// First dodge pulls the button out of the row and pins it to the viewport.
fn place_decline_button(
    mut cmd: Commands,
    session: Res<ScoreSession>,
    mut decline: Query<(Entity, &mut Node, &Parent), With<DeclineButton>>,
    game_layers: Query<Entity, With<GameLayer>>,
) {
    if !session.is_changed() {
        return;
    }
    let Some(position) = session.position else {
        return;
    };
    let Ok((entity, mut node, parent)) = decline.get_single_mut() else {
        return;
    };
    node.position_type = PositionType::Absolute;
    node.left = Val::Px(position.x);
    node.top = Val::Px(position.y);

    if let Ok(layer) = game_layers.get_single() {
        if parent.get() != layer {
            cmd.entity(entity).set_parent(layer);
        }
    }
}

fn update_accept_label(session: Res<ScoreSession>, mut labels: Query<&mut Text, With<AcceptLabel>>) {
    if !session.is_changed() {
        return;
    }
    let label = if session.is_submitting() {
        SUBMITTING_LABEL
    } else {
        ACCEPT_LABEL
    };
    for mut text in labels.iter_mut() {
        if text.0 != label {
            text.0 = label.to_string();
        }
    }
}

fn update_score_badge(session: Res<ScoreSession>, mut badges: Query<&mut Text, With<ScoreBadge>>) {
    if !session.is_changed() {
        return;
    }
    for mut text in badges.iter_mut() {
        text.0 = score_text(session.points);
    }
}

fn animate_pulse(time: Res<Time>, mut q: Query<(&mut BackgroundColor, &Pulse)>) {
    for (mut color, p) in q.iter_mut() {
        let alpha = 0.55 + (time.elapsed_secs() * p.speed).sin() * 0.25;
        color.0 = color.0.with_alpha(alpha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    use bevy::ecs::system::RunSystemOnce;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;
    use tokio::runtime::Runtime;
    use uuid::Uuid;

    use crate::recorder::InteractionRecorder;
    use crate::records::{INTERACTIONS, SESSION_ID};
    use crate::rewards::{collect_rewards, tick_reward_timers, RewardView, TRIM_INTERVAL};
    use crate::store::{DocumentStore, MemoryStore};

    fn recorder() -> InteractionRecorder {
        InteractionRecorder::new(Arc::new(DocumentStore::Memory(MemoryStore::default())))
    }

    fn page_app(recorder: InteractionRecorder) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Font>()
            .init_resource::<ScoreSession>()
            .init_resource::<CompletionDelay>()
            .insert_resource(PageConfig::default())
            .insert_resource(Persistence::with_recorder(Runtime::new().unwrap(), recorder))
            .add_event::<DodgeTriggered>()
            .add_event::<AcceptClicked>()
            .add_event::<RewardCollected>()
            .add_event::<SuccessCue>()
            .add_systems(
                Update,
                (
                    handle_dodges,
                    handle_accept,
                    handle_rewards,
                    apply_settled,
                    tick_completion,
                    show_thank_you,
                )
                    .chain(),
            );
        app.world_mut().spawn((Window::default(), PrimaryWindow));
        app.world_mut().spawn((Node::default(), PageRoot));
        app
    }

    fn pump_until(app: &mut App, done: impl Fn(&World) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(app.world()) {
            assert!(Instant::now() < deadline, "condition never reached");
            std::thread::sleep(Duration::from_millis(5));
            app.update();
        }
    }

    fn session(app: &App) -> &ScoreSession {
        app.world().resource::<ScoreSession>()
    }

    fn stored(app: &App, recorder: &InteractionRecorder) -> crate::records::InteractionRecord {
        app.world()
            .resource::<Persistence>()
            .runtime()
            .block_on(recorder.interactions())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn dodges_are_ignored_while_one_is_being_written() {
        let recorder = recorder();
        let mut app = page_app(recorder.clone());

        app.world_mut().send_event(DodgeTriggered);
        app.world_mut().send_event(DodgeTriggered);
        app.update();
        assert_eq!(session(&app).dodge_count, 1);

        let first = session(&app).position.unwrap();
        assert!(first.x >= 0.0 && first.x <= 1280.0);
        assert!(first.y >= 0.0 && first.y <= 720.0);

        pump_until(&mut app, |w| !w.resource::<ScoreSession>().dodge_in_flight);
        app.world_mut().send_event(DodgeTriggered);
        app.update();
        pump_until(&mut app, |w| !w.resource::<ScoreSession>().dodge_in_flight);

        assert_eq!(session(&app).dodge_count, 2);
        let clicks: Vec<u32> = stored(&app, &recorder)
            .sessions
            .iter()
            .map(|s| s.click_number)
            .collect();
        assert_eq!(clicks, vec![1, 2]);
    }

    #[test]
    fn failed_dodge_write_still_releases_the_guard() {
        let recorder = recorder();
        let mut app = page_app(recorder.clone());
        app.world()
            .resource::<Persistence>()
            .runtime()
            .block_on(recorder.store().set(INTERACTIONS, SESSION_ID, json!({ "sessions": 1 })))
            .unwrap();

        app.world_mut().send_event(DodgeTriggered);
        app.update();
        pump_until(&mut app, |w| !w.resource::<ScoreSession>().dodge_in_flight);
        assert_eq!(session(&app).dodge_count, 1);
    }

    #[test]
    fn collected_rewards_add_to_score_and_store() {
        let recorder = recorder();
        let mut app = page_app(recorder.clone());

        app.world_mut().send_event(RewardCollected { value: 7 });
        app.update();
        assert_eq!(session(&app).points, 7);

        let deadline = Instant::now() + Duration::from_secs(5);
        while stored_points(&app, &recorder) != Some(7) {
            assert!(Instant::now() < deadline, "points never written");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn pressing_a_reward_raises_the_badge_by_its_value() {
        let mut app = page_app(recorder());
        let field = RewardField::seeded(&mut StdRng::seed_from_u64(3));
        let token = field.tokens()[1].clone();
        let others: Vec<Uuid> = field
            .tokens()
            .iter()
            .map(|t| t.id)
            .filter(|id| *id != token.id)
            .collect();
        app.insert_resource(field).add_systems(
            Update,
            (
                collect_rewards.before(handle_rewards),
                update_score_badge.after(handle_rewards),
            ),
        );
        let badge = app
            .world_mut()
            .spawn((Text::new(score_text(0)), ScoreBadge))
            .id();
        app.world_mut()
            .spawn((Interaction::Pressed, RewardView::new(token.id, 0.0, 5.0)));

        app.update();

        assert_eq!(session(&app).points, token.point_value);
        let shown = &app.world().get::<Text>(badge).unwrap().0;
        assert_eq!(*shown, format!("💎 {}", token.point_value));
        let left: Vec<Uuid> = app
            .world()
            .resource::<RewardField>()
            .tokens()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(left, others);
    }

    fn stored_points(app: &App, recorder: &InteractionRecorder) -> Option<u32> {
        app.world()
            .resource::<Persistence>()
            .runtime()
            .block_on(recorder.interactions())
            .unwrap()
            .map(|r| r.points)
    }

    #[test]
    fn accept_waits_for_write_then_delay_then_thanks() {
        let recorder = recorder();
        let mut app = page_app(recorder.clone());
        app.insert_resource(RewardTimers::default())
            .insert_resource(RewardField::seeded(&mut StdRng::seed_from_u64(8)))
            .add_systems(Update, tick_reward_timers);
        {
            let mut session = app.world_mut().resource_mut::<ScoreSession>();
            session.points = 12;
            session.dodge_count = 5;
        }

        app.world_mut().send_event(AcceptClicked);
        app.update();
        assert!(session(&app).is_submitting());

        // Counts are frozen while the answer is being written
        app.world_mut().send_event(RewardCollected { value: 5 });
        app.world_mut().send_event(DodgeTriggered);
        app.update();
        assert_eq!(session(&app).points, 12);
        assert_eq!(session(&app).dodge_count, 5);

        // Real frame time drives the completion delay
        let started = Instant::now();
        pump_until(&mut app, |w| w.resource::<ScoreSession>().is_completed());
        assert!(started.elapsed() >= COMPLETION_DELAY);
        assert_eq!(app.world().resource::<Events<SuccessCue>>().len(), 1);

        let mut finals = app.world_mut().query_filtered::<&Text, With<FinalScore>>();
        let shown: Vec<String> = finals.iter(app.world()).map(|t| t.0.clone()).collect();
        assert_eq!(shown, vec!["12".to_string()]);
        assert_eq!(stored_points(&app, &recorder), None);

        // Reward timers are gone with the game layer
        assert!(!app.world().contains_resource::<RewardTimers>());
        assert!(app.world().resource::<RewardField>().is_empty());
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(TRIM_INTERVAL);
        let _ = app.world_mut().run_system_once(tick_reward_timers);
        assert!(app.world().resource::<RewardField>().is_empty());

        let response = app
            .world()
            .resource::<Persistence>()
            .runtime()
            .block_on(recorder.final_response())
            .unwrap()
            .unwrap();
        assert_eq!(response.final_points, 12);
        assert_eq!(response.dodge_count_before_yes, 5);
    }
}
