pub mod classifier;
pub mod detection;
pub mod dom;
pub mod focus;
pub mod i18n;
pub mod settings;
pub mod tracker;
pub mod utils;
pub mod window;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, Mutex};

use classifier::{ClassifierConfig, ReminderClassifier};
use detection::{CandidateOutcome, DetectionObserver, DetectionPipeline, HostEvent};
use dom::Document;
use focus::{FocusOrchestrator, FocusSnapshot};
use i18n::{Locale, SharedTranslator, TranslationKey, Translator};
use settings::{Language, Settings, SettingsError, SettingsStore};
use tracker::ModalTracker;
use utils::logging;
use window::WindowControl;

/// Capacity of the host event channel [`HostContext::new`] creates.
const HOST_EVENT_CAPACITY: usize = 16;

/// Short user-facing messages (toasts in the host UI).
pub trait Notifier: Send + Sync {
    fn notice(&self, message: &str);
}

/// Notifier for hosts without a notice area.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notice(&self, message: &str) {
        log::info!("{} {message}", logging::LOG_PREFIX);
    }
}

/// Everything the host hands over on load.
pub struct HostContext {
    pub document: Document,
    pub window: Option<Arc<dyn WindowControl>>,
    pub host_events: broadcast::Sender<HostEvent>,
    pub notifier: Arc<dyn Notifier>,
    /// Host UI locale, e.g. `zh-CN`
    pub locale: Option<String>,
    /// `None` keeps settings in memory for the session
    pub settings_path: Option<PathBuf>,
    pub classifier: ClassifierConfig,
}

impl HostContext {
    pub fn new(document: Document) -> Self {
        let (host_events, _) = broadcast::channel(HOST_EVENT_CAPACITY);
        Self {
            document,
            window: None,
            host_events,
            notifier: Arc::new(LogNotifier),
            locale: None,
            settings_path: None,
            classifier: ClassifierConfig::default(),
        }
    }

    pub fn with_window(mut self, window: Arc<dyn WindowControl>) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }
}

/// The plugin: detects the reminder dialog and brings it to the user.
pub struct ReminderFocus {
    document: Document,
    settings: Arc<SettingsStore>,
    translator: SharedTranslator,
    locale: Option<String>,
    notifier: Arc<dyn Notifier>,
    classifier: Arc<ReminderClassifier>,
    tracker: ModalTracker,
    focus: FocusOrchestrator,
    pipeline: DetectionPipeline,
    observer: Mutex<DetectionObserver>,
}

impl ReminderFocus {
    /// Loads settings, picks the message table and starts detection. Must be
    /// called inside a tokio runtime.
    pub async fn on_load(ctx: HostContext) -> Result<Arc<Self>> {
        logging::init();

        let settings = match &ctx.settings_path {
            Some(path) => SettingsStore::new(path.clone()).context("Failed to load settings")?,
            None => SettingsStore::in_memory(Settings::default()),
        };
        let settings = Arc::new(settings);
        let current = settings.get();
        logging::set_debug_mode(current.debug_mode);

        let translator = SharedTranslator::new(Translator::new(Locale::resolve(
            current.language,
            ctx.locale.as_deref(),
        )));
        let window = window::resolve(ctx.window);
        let classifier = Arc::new(ReminderClassifier::new(ctx.classifier));
        let tracker = ModalTracker::new();
        let focus = FocusOrchestrator::new(
            ctx.document.clone(),
            window,
            settings.clone(),
            translator.clone(),
        );
        let pipeline = DetectionPipeline::new(
            ctx.document.clone(),
            classifier.clone(),
            tracker.clone(),
            focus.clone(),
            settings.clone(),
        );
        let observer = DetectionObserver::new(
            ctx.document.clone(),
            ctx.host_events,
            classifier.config().container_class.clone(),
        );

        let plugin = Arc::new(Self {
            document: ctx.document,
            settings,
            translator,
            locale: ctx.locale,
            notifier: ctx.notifier,
            classifier,
            tracker,
            focus,
            pipeline,
            observer: Mutex::new(observer),
        });

        plugin.start_detection().await?;
        log::info!("{} loaded", plugin.t(TranslationKey::PluginName));
        Ok(plugin)
    }

    /// Stops detection and forgets every handled dialog, watch and cooldown.
    /// Runs already in flight finish on their own.
    pub async fn on_unload(&self) -> Result<()> {
        self.observer.lock().await.stop().await?;
        self.tracker.clear();
        self.focus.reset();
        log::info!("{} unloaded", self.t(TranslationKey::PluginName));
        Ok(())
    }

    pub async fn restart_detection(&self) -> Result<()> {
        let mut observer = self.observer.lock().await;
        observer.stop().await?;
        self.start_locked(&mut observer)
    }

    async fn start_detection(&self) -> Result<()> {
        let mut observer = self.observer.lock().await;
        self.start_locked(&mut observer)
    }

    fn start_locked(&self, observer: &mut DetectionObserver) -> Result<()> {
        let pipeline = self.pipeline.clone();
        observer.start(self.settings.detection_interval(), move |node| {
            pipeline.submit(node);
        })
    }

    /// Submits every attached dialog wrapper right away. Must be called inside
    /// a tokio runtime, like everything that can start a focus run.
    pub fn rescan(&self) -> Vec<CandidateOutcome> {
        let nodes = {
            let view = self.document.view();
            view.elements_with_class(view.root(), &self.classifier.config().container_class)
        };
        nodes
            .into_iter()
            .map(|node| self.pipeline.submit(node))
            .collect()
    }

    pub fn t(&self, key: TranslationKey) -> &'static str {
        self.translator.t(key)
    }

    pub fn locale(&self) -> Locale {
        self.translator.get().locale()
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn focus_snapshot(&self) -> FocusSnapshot {
        self.focus.snapshot()
    }

    pub fn tracker(&self) -> &ModalTracker {
        &self.tracker
    }

    pub async fn is_detecting(&self) -> bool {
        self.observer.lock().await.is_running()
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.settings.set_enabled(enabled)?;
        Ok(())
    }

    pub fn set_debug_mode(&self, debug_mode: bool) -> Result<()> {
        let saved = self.settings.set_debug_mode(debug_mode)?;
        logging::set_debug_mode(saved.debug_mode);
        Ok(())
    }

    /// Picks up an outside edit of the settings file and applies it the same
    /// way the individual setters do.
    pub async fn reload_settings(&self) -> Result<Settings> {
        let before = self.settings.get();
        let reloaded = self.settings.reload()?;

        logging::set_debug_mode(reloaded.debug_mode);
        self.apply_language(reloaded.language);
        if reloaded.detection_interval_ms != before.detection_interval_ms {
            self.restart_detection().await?;
        }
        log_debug!("Settings reloaded: {reloaded:?}");
        Ok(reloaded)
    }

    fn apply_language(&self, language: Language) {
        self.translator.set(Translator::new(Locale::resolve(
            language,
            self.locale.as_deref(),
        )));
    }

    /// Switches the message table and confirms in the new language.
    pub fn set_language(&self, language: Language) -> Result<()> {
        let saved = self.settings.set_language(language)?;
        self.apply_language(saved.language);
        self.notifier.notice(self.t(TranslationKey::SettingsSaved));
        Ok(())
    }

    /// On rejection the stored value is kept and the user gets a notice.
    pub fn set_focus_interval(&self, raw: &str) -> Result<(), SettingsError> {
        self.settings
            .set_focus_interval(raw)
            .map(|_| ())
            .inspect_err(|err| self.report(err))
    }

    /// Restarts detection so the new poll interval takes effect.
    pub async fn set_detection_interval(&self, raw: &str) -> Result<(), SettingsError> {
        let before = self.settings.detection_interval();
        let saved = self
            .settings
            .set_detection_interval(raw)
            .inspect_err(|err| self.report(err))?;
        if saved.detection_interval() != before {
            self.restart_detection().await?;
        }
        Ok(())
    }

    fn report(&self, err: &SettingsError) {
        log_warn!("Settings change rejected: {err}");
        let key = match err {
            SettingsError::InvalidFocusInterval { .. } => TranslationKey::InvalidInterval,
            SettingsError::InvalidDetectionInterval { .. } => {
                TranslationKey::InvalidDetectionInterval
            }
            SettingsError::Persist(_) => return,
        };
        self.notifier.notice(self.t(key));
    }
}
