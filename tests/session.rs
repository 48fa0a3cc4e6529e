use std::time::Instant;

use now_playing_live::animation::RingSample;
use now_playing_live::artwork::Artwork;
use now_playing_live::compositor::{Compositor, CANVAS_HEIGHT, CANVAS_WIDTH};
use now_playing_live::config::{DisplayPolicy, WidgetConfig, WidgetVariant};
use now_playing_live::surface::{DisplaySurface, FrameSurface};
use now_playing_live::types::{DisplayMode, PlaybackState};
use now_playing_live::WidgetSession;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Mode(DisplayMode),
    Title(String),
    Artist(String),
    Time(Option<String>),
    Progress(Option<f64>),
    Playing(bool),
    LoadArtwork(String),
    ClearArtwork(Option<String>),
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    frames: usize,
}

impl Recorder {
    fn take(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }
}

impl DisplaySurface for Recorder {
    fn set_mode(&mut self, mode: DisplayMode) {
        self.calls.push(Call::Mode(mode));
    }
    fn set_title(&mut self, title: &str) {
        self.calls.push(Call::Title(title.to_string()));
    }
    fn set_artist(&mut self, artist: &str) {
        self.calls.push(Call::Artist(artist.to_string()));
    }
    fn set_time(&mut self, text: Option<&str>) {
        self.calls.push(Call::Time(text.map(str::to_string)));
    }
    fn set_progress(&mut self, fraction: Option<f64>) {
        self.calls.push(Call::Progress(fraction));
    }
    fn set_playing(&mut self, playing: bool) {
        self.calls.push(Call::Playing(playing));
    }
    fn load_artwork(&mut self, url: &str) {
        self.calls.push(Call::LoadArtwork(url.to_string()));
    }
    fn clear_artwork(&mut self, placeholder: Option<&str>) {
        self.calls.push(Call::ClearArtwork(placeholder.map(str::to_string)));
    }
    fn set_rotation(&mut self, _turns: f64) {
        self.frames += 1;
    }
    fn draw_ring(&mut self, _samples: &[RingSample]) {}
}

fn session(variant: WidgetVariant) -> WidgetSession<Recorder> {
    let mut config = WidgetConfig::default();
    config.connection.host = "widget.test:8080".to_string();
    config.display = DisplayPolicy::for_variant(variant);
    let mut session = WidgetSession::new(&config, Recorder::default());
    session.surface_mut().take();
    session
}

fn playing(title: &str, artist: &str, image: Option<&str>) -> PlaybackState {
    PlaybackState {
        title: Some(title.to_string()),
        artist: Some(artist.to_string()),
        current_time: Some(65.0),
        duration: Some(200.0),
        paused: false,
        image_file: image.map(str::to_string),
    }
}

fn artwork_loads(calls: &[Call]) -> usize {
    calls
        .iter()
        .filter(|call| matches!(call, Call::LoadArtwork(_)))
        .count()
}

#[test]
fn missing_title_renders_idle_regardless_of_other_fields() {
    let mut session = session(WidgetVariant::NeonVinyl);
    let state = PlaybackState {
        title: None,
        artist: Some("Ignored".to_string()),
        current_time: Some(10.0),
        duration: Some(20.0),
        paused: false,
        image_file: Some("cover.jpg".to_string()),
    };

    session.apply(&state, Instant::now());

    let calls = session.surface_mut().take();
    assert_eq!(
        calls,
        vec![
            Call::Mode(DisplayMode::Idle),
            Call::Title("—".to_string()),
            Call::Artist(String::new()),
            Call::Time(Some("waiting".to_string())),
            Call::Playing(false),
        ]
    );
    assert!(!session.render_state().is_playing);
    assert_eq!(session.render_state().last_image_token, None);
}

#[test]
fn track_text_and_time_are_applied() {
    let mut session = session(WidgetVariant::NeonVinyl);
    session.apply(&playing("Roygbiv", "Boards of Canada", None), Instant::now());

    let calls = session.surface_mut().take();
    assert!(calls.contains(&Call::Mode(DisplayMode::Track)));
    assert!(calls.contains(&Call::Title("Roygbiv".to_string())));
    assert!(calls.contains(&Call::Artist("Boards of Canada".to_string())));
    assert!(calls.contains(&Call::Time(Some("1:05 / 3:20".to_string()))));
    assert!(calls.contains(&Call::Playing(true)));
    // Neon vinyl has no progress bar
    assert!(!calls.iter().any(|call| matches!(call, Call::Progress(_))));
}

#[test]
fn time_is_hidden_when_duration_missing() {
    let mut session = session(WidgetVariant::Prism);
    session.apply(&playing("A", "B", None), Instant::now());
    session.surface_mut().take();

    let mut state = playing("A", "B", None);
    state.duration = None;
    session.apply(&state, Instant::now());

    let calls = session.surface_mut().take();
    assert!(calls.contains(&Call::Time(None)));
    assert!(calls.contains(&Call::Progress(None)));
}

#[test]
fn prism_defaults_and_clamped_progress() {
    let mut session = session(WidgetVariant::Prism);
    let mut state = playing("Song", "", Some("a.png"));
    state.current_time = Some(250.0);
    session.apply(&state, Instant::now());

    let calls = session.surface_mut().take();
    assert!(calls.contains(&Call::Artist("Unknown Artist".to_string())));
    assert!(calls.contains(&Call::Progress(Some(1.0))));
}

#[test]
fn unchanged_artwork_is_fetched_once() {
    let mut session = session(WidgetVariant::NeonVinyl);
    let state = playing("A", "B", Some("cover-1.jpg"));

    session.apply(&state, Instant::now());
    let first = session.surface_mut().take();
    assert_eq!(artwork_loads(&first), 1);
    let url = first
        .iter()
        .find_map(|call| match call {
            Call::LoadArtwork(url) => Some(url.clone()),
            _ => None,
        })
        .unwrap();
    assert!(url.starts_with("http://widget.test:8080/image?t="));

    let mut later = state.clone();
    later.current_time = Some(66.0);
    session.apply(&later, Instant::now());
    assert_eq!(artwork_loads(&session.surface_mut().take()), 0);

    session.apply(&playing("A", "B", Some("cover-2.jpg")), Instant::now());
    assert_eq!(artwork_loads(&session.surface_mut().take()), 1);
    assert_eq!(
        session.render_state().last_image_token.as_deref(),
        Some("cover-2.jpg")
    );
}

#[test]
fn removed_artwork_shows_variant_placeholder() {
    let mut neon = session(WidgetVariant::NeonVinyl);
    neon.apply(&playing("A", "B", Some("x")), Instant::now());
    neon.apply(&playing("A", "B", None), Instant::now());
    assert!(neon.surface_mut().take().contains(&Call::ClearArtwork(None)));

    let mut prism = session(WidgetVariant::Prism);
    prism.apply(&playing("A", "B", Some("x")), Instant::now());
    prism.apply(&playing("A", "B", None), Instant::now());
    assert!(prism
        .surface_mut()
        .take()
        .contains(&Call::ClearArtwork(Some("◇".to_string()))));
}

#[test]
fn new_session_starts_on_variant_placeholder() {
    let mut config = WidgetConfig::default();
    config.display = DisplayPolicy::for_variant(WidgetVariant::Prism);
    let mut prism = WidgetSession::new(&config, Recorder::default());
    assert_eq!(
        prism.surface_mut().take(),
        vec![Call::ClearArtwork(Some("◇".to_string()))]
    );

    config.display = DisplayPolicy::for_variant(WidgetVariant::NeonVinyl);
    let mut neon = WidgetSession::new(&config, Recorder::default());
    assert_eq!(neon.surface_mut().take(), vec![Call::ClearArtwork(None)]);
}

#[test]
fn first_track_without_artwork_shows_prism_placeholder() {
    let mut config = WidgetConfig::default();
    config.display = DisplayPolicy::for_variant(WidgetVariant::Prism);
    let mut prism = WidgetSession::new(&config, FrameSurface::new(Compositor::without_text(), None));
    prism.apply(&playing("Song", "Artist", None), Instant::now());
    assert!(matches!(prism.surface().artwork(), Artwork::Placeholder(glyph) if glyph == "◇"));

    let config = WidgetConfig::default();
    let mut neon = WidgetSession::new(&config, FrameSurface::new(Compositor::without_text(), None));
    neon.apply(&playing("Song", "Artist", None), Instant::now());
    assert!(matches!(neon.surface().artwork(), Artwork::Hidden));
}

#[test]
fn unpausing_spins_up_on_next_frame() {
    let mut session = session(WidgetVariant::NeonVinyl);
    let mut state = playing("A", "B", None);
    state.paused = true;

    session.apply(&state, Instant::now());
    assert!(!session.render_state().is_playing);
    session.advance_frame(Instant::now(), 0.0);
    assert_eq!(session.animation().spin().target_speed(), 0.0);

    state.paused = false;
    session.apply(&state, Instant::now());
    assert!(session.render_state().is_playing);
    session.advance_frame(Instant::now(), 0.0);
    assert!(session.animation().spin().target_speed() > 0.0);
    assert!(session.animation().spin().current_speed() > 0.0);
    assert_eq!(session.surface().frames, 2);
}

#[test]
fn seed_follows_track_identity() {
    let mut session = session(WidgetVariant::NeonVinyl);
    session.apply(&playing("Song", "Artist", None), Instant::now());
    assert_eq!(session.render_state().last_seed, 9_770);

    session.apply(&PlaybackState::default(), Instant::now());
    session.apply(&playing("Song", "Artist", None), Instant::now());
    assert_eq!(session.render_state().last_seed, 9_770);
}

#[test]
fn frame_surface_degrades_without_artwork_loader() {
    let config = WidgetConfig::default();
    let surface = FrameSurface::new(Compositor::without_text(), None);
    let mut session = WidgetSession::new(&config, surface);

    session.apply(&playing("A", "B", Some("cover.jpg")), Instant::now());
    session.advance_frame(Instant::now(), 1_700_000_000.0);

    assert_eq!(session.surface().mode(), DisplayMode::Track);
    assert!(matches!(session.surface().artwork(), Artwork::Broken));

    let frame = session.surface().render_frame();
    assert_eq!(frame.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
}
