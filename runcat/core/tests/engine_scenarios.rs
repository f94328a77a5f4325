//! End-to-end scenarios for the runcat core
//!
//! These drive the public API the way the agent binary does: a real
//! `AnimationEngine` or `App`, an in-memory tray channel standing in for the
//! widget, and tokio's paused clock for the timing.
//!
//! # Scenarios
//!
//! 1. Load pacing - a CPU reading speeds up the next wait
//! 2. Creature switch - repaint at frame 0 without waiting for a tick
//! 3. Theme follow - Light to Auto on a dark OS
//! 4. Sampler restart - a stopped sampler never feeds the engine again
//! 5. Persistence - choices survive a restart through the TOML settings file

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_test::assert_ok;

use runcat_core::platform::UnsupportedPlatform;
use runcat_core::{
    asset_source, frame_path, AgentConfig, AnimationEngine, App, AppParts, CpuProbe, Creature,
    EffectiveTheme, Flow, IconStore, LoadSampler, MemoryAssetSource, MenuItemId, Platform,
    PlatformError, SampleError, Settings, SettingsStore, SpeedCap, SpeedPolicy, ThemeMode,
    ThemeResolver, TomlSettingsStore, TrayCommand, TrayHandle, MIN_INTERVAL,
};

// ============================================================================
// Fixtures
// ============================================================================

struct DesktopPlatform {
    theme: Mutex<String>,
    autostart: AtomicBool,
}

impl DesktopPlatform {
    fn new(theme: &str) -> Arc<Self> {
        Arc::new(Self {
            theme: Mutex::new(theme.to_string()),
            autostart: AtomicBool::new(false),
        })
    }
}

impl Platform for DesktopPlatform {
    fn system_theme(&self) -> String {
        self.theme.lock().clone()
    }

    fn set_startup(&self, enabled: bool) -> Result<(), PlatformError> {
        self.autostart.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn is_startup_enabled(&self) -> Result<bool, PlatformError> {
        Ok(self.autostart.load(Ordering::SeqCst))
    }

    fn open_system_monitor(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}

fn full_assets() -> MemoryAssetSource {
    let mut source = MemoryAssetSource::new();
    for creature in Creature::ALL {
        for theme in EffectiveTheme::ALL {
            source = source.with_frames(creature, theme, creature.default_frame_count());
        }
    }
    source
}

fn engine(
    os_theme: &str,
    settings: Settings,
) -> (Arc<AnimationEngine>, UnboundedReceiver<TrayCommand>) {
    let platform = DesktopPlatform::new(os_theme);
    let probe = Arc::new(Arc::clone(&platform));
    let resolver = Arc::new(ThemeResolver::new(probe, settings.theme));
    let store = Arc::new(IconStore::new(Arc::new(full_assets())));
    let (tray, rx) = TrayHandle::channel();
    let engine = AnimationEngine::new(store, resolver, platform, tray, &settings);
    (engine, rx)
}

/// Paths of the icons pushed since the last call
fn icons(rx: &mut UnboundedReceiver<TrayCommand>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(cmd) = rx.try_recv() {
        if let TrayCommand::SetIcon(bytes) = cmd {
            out.push(String::from_utf8_lossy(&bytes).into_owned());
        }
    }
    out
}

struct Flat(f64);

impl CpuProbe for Flat {
    fn sample(&mut self) -> Result<f64, SampleError> {
        Ok(self.0)
    }
}

// ============================================================================
// Scenario 1: Load pacing
// ============================================================================

/// Scenario: 60% CPU under the adaptive policy
///
/// The wait already in progress (200ms) is not cut short. The tick at its
/// end shows frame 1, and every following wait is the 25ms floor.
#[tokio::test(start_paused = true)]
async fn scenario_1_load_speeds_up_next_wait() {
    let (engine, mut rx) = engine("light", Settings::default());
    assert!(engine.start().await);
    assert_eq!(
        icons(&mut rx),
        vec![frame_path(Creature::Cat, EffectiveTheme::Light, 0)]
    );

    // Let the tick loop begin its first 200ms wait
    tokio::task::yield_now().await;
    assert_eq!(engine.interval(), Duration::from_millis(200));

    engine.update_load(60.0);
    assert_eq!(engine.interval(), MIN_INTERVAL);

    tokio::time::sleep(Duration::from_millis(210)).await;
    assert_eq!(
        icons(&mut rx),
        vec![frame_path(Creature::Cat, EffectiveTheme::Light, 1)]
    );

    tokio::time::sleep(MIN_INTERVAL).await;
    assert_eq!(
        icons(&mut rx),
        vec![frame_path(Creature::Cat, EffectiveTheme::Light, 2)]
    );

    engine.stop();
}

// ============================================================================
// Scenario 2: Creature switch
// ============================================================================

/// Scenario: Parrot at frame 7, user picks Horse
///
/// The horse's frame 0 is pushed right away and the next tick continues from
/// there.
#[test]
fn scenario_2_creature_switch_repaints_at_frame_zero() {
    let settings = Settings {
        runner: Creature::Parrot,
        ..Settings::default()
    };
    let (engine, mut rx) = engine("light", settings);
    for _ in 0..7 {
        assert!(engine.tick());
    }
    assert_eq!(engine.frame_index(), 7);
    icons(&mut rx);

    assert!(engine.set_creature(Creature::Horse));
    assert_eq!(engine.frame_index(), 0);
    assert_eq!(
        icons(&mut rx),
        vec![frame_path(Creature::Horse, EffectiveTheme::Light, 0)]
    );

    engine.tick();
    assert_eq!(
        icons(&mut rx),
        vec![frame_path(Creature::Horse, EffectiveTheme::Light, 1)]
    );
}

// ============================================================================
// Scenario 3: Theme follow
// ============================================================================

/// Scenario: Light mode on a dark desktop, user picks Auto
///
/// The effective theme flips once and the current frame is repainted from
/// the dark set without advancing.
#[tokio::test(start_paused = true)]
async fn scenario_3_auto_mode_follows_dark_desktop() {
    let settings = Settings {
        theme: ThemeMode::Light,
        ..Settings::default()
    };
    let (engine, mut rx) = engine("Dark", settings);
    assert!(engine.start().await);
    assert_eq!(engine.effective_theme(), EffectiveTheme::Light);
    engine.tick();
    engine.tick();
    icons(&mut rx);

    assert!(engine.set_theme_mode(ThemeMode::Auto));
    assert_eq!(engine.effective_theme(), EffectiveTheme::Dark);
    assert_eq!(
        icons(&mut rx),
        vec![frame_path(Creature::Cat, EffectiveTheme::Dark, 2)]
    );

    // Same selection again is a no-op
    assert!(!engine.set_theme_mode(ThemeMode::Auto));
    assert!(icons(&mut rx).is_empty());

    engine.stop();
}

// ============================================================================
// Scenario 4: Sampler restart
// ============================================================================

/// Scenario: sampler feeding an engine is stopped, then restarted with a new
/// consumer
///
/// The first consumer receives nothing after `stop` returns.
#[tokio::test(start_paused = true)]
async fn scenario_4_stopped_sampler_never_reaches_old_consumer() {
    let (engine, _rx) = engine("light", Settings::default());
    let sampler = LoadSampler::new(Box::new(Flat(80.0)));

    let fed = Arc::clone(&engine);
    assert!(sampler.start(Duration::from_secs(1), move |cpu| fed.update_load(cpu)));
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(engine.snapshot().last_cpu, 80.0);

    sampler.stop();
    assert!(!sampler.is_running());

    let late = Arc::new(AtomicUsize::new(0));
    engine.update_load(0.0);
    let counter = Arc::clone(&late);
    assert!(sampler.start(Duration::from_secs(1), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    tokio::time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(engine.snapshot().last_cpu, 0.0);
    assert_eq!(late.load(Ordering::SeqCst), 3);
    sampler.stop();
}

// ============================================================================
// Scenario 5: Persistence
// ============================================================================

fn write_asset_tree(base: &std::path::Path) {
    for creature in Creature::ALL {
        for theme in EffectiveTheme::ALL {
            for index in 0..3 {
                let path = base.join(frame_path(creature, theme, index));
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, [index as u8]).unwrap();
            }
        }
    }
}

fn file_app(dir: &std::path::Path) -> (App, UnboundedReceiver<TrayCommand>) {
    let settings_path = dir.join("settings.toml");
    let config = AgentConfig::default()
        .with_assets_dir(dir)
        .with_settings_path(&settings_path);
    let parts = AppParts {
        platform: Arc::new(UnsupportedPlatform),
        assets: asset_source(&config),
        cpu_probe: Box::new(Flat(10.0)),
        settings: Arc::new(TomlSettingsStore::new(settings_path)),
    };
    let (tray, rx) = TrayHandle::channel();
    (App::new(config, parts, tray), rx)
}

/// Scenario: choices made from the menu survive a restart
///
/// Setup:
/// - Asset tree with three frames per (creature, theme) on disk
/// - Settings file in the same temp directory
///
/// Pass Criteria:
/// - First run writes the defaults
/// - Runner, theme and speed picks are written to the file
/// - A second `App` on the same directory restores them
#[tokio::test(start_paused = true)]
async fn scenario_5_choices_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    write_asset_tree(dir.path());
    let store = TomlSettingsStore::new(dir.path().join("settings.toml"));

    let (app, mut rx) = file_app(dir.path());
    assert_eq!(assert_ok!(store.load()), Settings::default());

    app.start().await;
    assert!(app.is_sampling());
    // Frame files hold their own index
    assert_eq!(icons(&mut rx), vec!["\u{0}".to_string()]);

    let picks = [
        MenuItemId::Creature(Creature::Horse),
        MenuItemId::Theme(ThemeMode::Dark),
        MenuItemId::Speed(SpeedPolicy::Fixed(SpeedCap::Cpu20)),
    ];
    for pick in picks {
        assert_eq!(app.handle_event(pick).await, Flow::Continue);
    }
    assert_eq!(app.handle_event(MenuItemId::Quit).await, Flow::Quit);
    app.shutdown();
    assert!(!app.is_sampling());

    let saved = assert_ok!(store.load());
    assert_eq!(saved.runner, Creature::Horse);
    assert_eq!(saved.theme, ThemeMode::Dark);
    assert_eq!(saved.speed_limit, SpeedPolicy::Fixed(SpeedCap::Cpu20));

    let (restarted, _rx) = file_app(dir.path());
    assert_eq!(restarted.engine().creature(), Creature::Horse);
    assert_eq!(restarted.engine().theme_mode(), ThemeMode::Dark);
    assert_eq!(restarted.engine().effective_theme(), EffectiveTheme::Dark);
}
