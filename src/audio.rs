//! Background music, the success track, and the volume widget.

use std::time::Duration;

use bevy::audio::{AudioSinkPlayback, PlaybackMode, Volume};
use bevy::prelude::*;
use bevy::ui::FocusPolicy;

use crate::page::SuccessCue;
use crate::theme::EMOJI_FONT;

pub const BACKGROUND_TRACK: &str = "sounds/background-music.ogg";
pub const SUCCESS_TRACK: &str = "sounds/success-music.ogg";
pub const DEFAULT_VOLUME: f32 = 0.5;
pub const SLIDER_HIDE_DELAY: Duration = Duration::from_millis(2000);
pub const VOLUME_STEPS: u8 = 10;

/// Segment 0 is silence, segment `VOLUME_STEPS` is full volume.
pub fn segment_volume(step: u8) -> f32 {
    f32::from(step.min(VOLUME_STEPS)) / f32::from(VOLUME_STEPS)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VolumeIcon {
    Muted,
    Low,
    Medium,
    High,
}

impl VolumeIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            VolumeIcon::Muted => "🔇",
            VolumeIcon::Low => "🔈",
            VolumeIcon::Medium => "🔉",
            VolumeIcon::High => "🔊",
        }
    }
}

/// Playback and widget state. Muting never touches the stored volume.
#[derive(Resource, Debug)]
pub struct Soundtrack {
    volume: f32,
    muted: bool,
    started: bool,
    slider_visible: bool,
    hide_timer: Option<Timer>,
}

impl Default for Soundtrack {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}

impl Soundtrack {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            muted: false,
            started: false,
            slider_visible: false,
            hide_timer: None,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// What the sinks should actually play at.
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Picking an audible level while muted also unmutes.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if self.volume > 0.0 && self.muted {
            self.muted = false;
        }
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn icon(&self) -> VolumeIcon {
        if self.muted || self.volume == 0.0 {
            VolumeIcon::Muted
        } else if self.volume < 0.33 {
            VolumeIcon::Low
        } else if self.volume < 0.66 {
            VolumeIcon::Medium
        } else {
            VolumeIcon::High
        }
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    /// True only the first time; later gestures must not restart playback.
    pub fn mark_started(&mut self) -> bool {
        !std::mem::replace(&mut self.started, true)
    }

    pub fn slider_visible(&self) -> bool {
        self.slider_visible
    }

    pub fn reveal_slider(&mut self) {
        self.slider_visible = true;
        self.hide_timer = None;
    }

    pub fn schedule_hide(&mut self) {
        self.hide_timer = Some(Timer::new(SLIDER_HIDE_DELAY, TimerMode::Once));
    }

    /// Advances the hide countdown; returns true when the slider just hid.
    pub fn tick(&mut self, delta: Duration) -> bool {
        let Some(timer) = self.hide_timer.as_mut() else {
            return false;
        };
        if !timer.tick(delta).finished() {
            return false;
        }
        self.hide_timer = None;
        self.slider_visible = false;
        true
    }
}

#[derive(Component)]
pub struct BackgroundMusic;

#[derive(Component)]
pub struct SuccessMusic;

#[derive(Component)]
struct VolumeWidget;

#[derive(Component)]
struct MuteButton;

#[derive(Component)]
struct MuteIcon;

#[derive(Component)]
struct VolumeSlider;

#[derive(Component)]
struct VolumeSegment(u8);

pub struct SoundtrackPlugin;

impl Plugin for SoundtrackPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Soundtrack>()
            .add_systems(Startup, setup_soundtrack)
            .add_systems(
                Update,
                (
                    start_on_first_gesture,
                    play_success_on_cue,
                    hover_volume_widget,
                    click_mute,
                    click_volume_segments,
                    hide_slider_after_delay,
                    apply_volume,
                    refresh_volume_widget,
                )
                    .chain(),
            );
    }
}

fn setup_soundtrack(mut cmd: Commands, asset_server: Res<AssetServer>, soundtrack: Res<Soundtrack>) {
    // Loaded paused; browsers and players alike wait for a gesture
    cmd.spawn((
        AudioPlayer::new(asset_server.load(BACKGROUND_TRACK)),
        PlaybackSettings {
            mode: PlaybackMode::Loop,
            volume: Volume::new(soundtrack.effective_volume()),
            paused: true,
            ..default()
        },
        BackgroundMusic,
    ));

    let emoji = asset_server.load(EMOJI_FONT);
    cmd.spawn((
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(16.0),
            bottom: Val::Px(16.0),
            column_gap: Val::Px(8.0),
            align_items: AlignItems::Center,
            ..default()
        },
        Interaction::default(),
        FocusPolicy::Pass,
        GlobalZIndex(10),
        VolumeWidget,
    ))
    .with_children(|widget| {
        widget
            .spawn((
                Button,
                Node {
                    width: Val::Px(48.0),
                    height: Val::Px(48.0),
                    justify_content: JustifyContent::Center,
                    align_items: AlignItems::Center,
                    ..default()
                },
                BackgroundColor(Color::srgba(1.0, 1.0, 1.0, 0.8)),
                BorderRadius::MAX,
                FocusPolicy::Pass,
                MuteButton,
            ))
            .with_children(|button| {
                button.spawn((
                    Text::new(soundtrack.icon().glyph()),
                    TextFont {
                        font: emoji.clone(),
                        font_size: 22.0,
                        ..default()
                    },
                    TextColor(Color::srgb(0.34, 0.33, 0.31)),
                    MuteIcon,
                ));
            });

        widget
            .spawn((
                Node {
                    display: Display::None,
                    padding: UiRect::axes(Val::Px(14.0), Val::Px(12.0)),
                    column_gap: Val::Px(3.0),
                    ..default()
                },
                BackgroundColor(Color::srgba(1.0, 1.0, 1.0, 0.8)),
                BorderRadius::MAX,
                VolumeSlider,
            ))
            .with_children(|slider| {
                for step in 0..=VOLUME_STEPS {
                    slider.spawn((
                        Button,
                        Node {
                            width: Val::Px(8.0),
                            height: Val::Px(16.0),
                            ..default()
                        },
                        BackgroundColor(Color::NONE),
                        BorderRadius::all(Val::Px(2.0)),
                        FocusPolicy::Pass,
                        VolumeSegment(step),
                    ));
                }
            });
    });
}

fn start_on_first_gesture(
    mouse: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    mut soundtrack: ResMut<Soundtrack>,
    background: Query<&AudioSink, With<BackgroundMusic>>,
) {
    if soundtrack.has_started() {
        return;
    }
    if !mouse.just_pressed(MouseButton::Left) && !touches.any_just_pressed() {
        return;
    }
    // The sink only exists once the asset has loaded; try again next click
    let Ok(sink) = background.get_single() else {
        warn!("Background track not ready yet");
        return;
    };
    sink.play();
    soundtrack.mark_started();
    info!("Background music started");
}

fn play_success_on_cue(
    mut cmd: Commands,
    mut cues: EventReader<SuccessCue>,
    mut soundtrack: ResMut<Soundtrack>,
    background: Query<&AudioSink, With<BackgroundMusic>>,
    previous: Query<Entity, With<SuccessMusic>>,
    asset_server: Res<AssetServer>,
) {
    if cues.read().count() == 0 {
        return;
    }
    info!("Switching to success track");
    for sink in background.iter() {
        sink.pause();
    }
    // Respawning restarts the track from the beginning
    for entity in previous.iter() {
        cmd.entity(entity).despawn();
    }
    cmd.spawn((
        AudioPlayer::new(asset_server.load(SUCCESS_TRACK)),
        PlaybackSettings {
            mode: PlaybackMode::Loop,
            volume: Volume::new(soundtrack.effective_volume()),
            ..default()
        },
        SuccessMusic,
    ));
    // A later first click must not resume the background track
    soundtrack.mark_started();
}

fn hover_volume_widget(
    widgets: Query<&Interaction, (Changed<Interaction>, With<VolumeWidget>)>,
    mut soundtrack: ResMut<Soundtrack>,
) {
    for interaction in widgets.iter() {
        match interaction {
            Interaction::Hovered | Interaction::Pressed => soundtrack.reveal_slider(),
            Interaction::None => soundtrack.schedule_hide(),
        }
    }
}

fn click_mute(
    buttons: Query<&Interaction, (Changed<Interaction>, With<MuteButton>)>,
    mut soundtrack: ResMut<Soundtrack>,
) {
    for interaction in buttons.iter() {
        if *interaction == Interaction::Pressed {
            soundtrack.toggle_mute();
        }
    }
}

fn click_volume_segments(
    segments: Query<(&Interaction, &VolumeSegment), Changed<Interaction>>,
    mut soundtrack: ResMut<Soundtrack>,
) {
    for (interaction, segment) in segments.iter() {
        if *interaction == Interaction::Pressed {
            soundtrack.set_volume(segment_volume(segment.0));
        }
    }
}

fn hide_slider_after_delay(time: Res<Time>, mut soundtrack: ResMut<Soundtrack>) {
    // Skip the mutable borrow when nothing is pending so change detection stays quiet
    if soundtrack.hide_timer.is_none() {
        return;
    }
    soundtrack.tick(time.delta());
}

fn apply_volume(
    soundtrack: Res<Soundtrack>,
    sinks: Query<&AudioSink, Or<(With<BackgroundMusic>, With<SuccessMusic>)>>,
) {
    if !soundtrack.is_changed() {
        return;
    }
    for sink in sinks.iter() {
        sink.set_volume(soundtrack.effective_volume());
    }
}

fn refresh_volume_widget(
    soundtrack: Res<Soundtrack>,
    mut icon: Query<&mut Text, With<MuteIcon>>,
    mut slider: Query<&mut Node, With<VolumeSlider>>,
    mut segments: Query<(&VolumeSegment, &mut BackgroundColor)>,
) {
    if !soundtrack.is_changed() {
        return;
    }
    for mut text in icon.iter_mut() {
        text.0 = soundtrack.icon().glyph().to_string();
    }
    for mut node in slider.iter_mut() {
        node.display = if soundtrack.slider_visible() {
            Display::Flex
        } else {
            Display::None
        };
    }
    for (segment, mut color) in segments.iter_mut() {
        let level = segment_volume(segment.0);
        let lit = segment.0 > 0
            && !soundtrack.is_muted()
            && level <= soundtrack.volume() + f32::EPSILON;
        color.0 = if lit {
            Color::srgb(0.06, 0.73, 0.51)
        } else {
            Color::srgba(0.34, 0.33, 0.31, 0.25)
        };
    }
}
