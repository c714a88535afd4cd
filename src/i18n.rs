use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::settings::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TranslationKey {
    PluginName,
    EnableFocus,
    EnableFocusDesc,
    FocusInterval,
    FocusIntervalDesc,
    DetectionInterval,
    DetectionIntervalDesc,
    Language,
    LanguageDesc,
    DebugMode,
    DebugModeDesc,
    Auto,
    Chinese,
    English,
    ReminderDetected,
    FocusSkipped,
    FocusCooldown,
    SettingsSaved,
    InvalidInterval,
    InvalidDetectionInterval,
}

/// A language the message tables exist for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Zh,
}

impl Locale {
    /// `Auto` follows the host's locale; only without one does it fall back to
    /// the process locale (`LC_ALL`, `LC_MESSAGES`, `LANG`), then English.
    pub fn resolve(language: Language, host_locale: Option<&str>) -> Self {
        Self::resolve_with(language, host_locale, process_locale)
    }

    pub fn resolve_with(
        language: Language,
        host_locale: Option<&str>,
        process_locale: impl FnOnce() -> Option<String>,
    ) -> Self {
        match language {
            Language::Zh => Locale::Zh,
            Language::En => Locale::En,
            Language::Auto => {
                let is_zh = match host_locale {
                    Some(locale) => is_chinese(locale),
                    None => process_locale().as_deref().is_some_and(is_chinese),
                };
                if is_zh {
                    Locale::Zh
                } else {
                    Locale::En
                }
            }
        }
    }
}

fn is_chinese(locale: &str) -> bool {
    locale.to_ascii_lowercase().starts_with("zh")
}

fn process_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|value| !value.is_empty()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translator {
    locale: Locale,
}

impl Translator {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn t(&self, key: TranslationKey) -> &'static str {
        match self.locale {
            Locale::En => english(key),
            Locale::Zh => chinese(key),
        }
    }
}

/// The active translator, swapped whenever the language setting changes.
#[derive(Debug, Clone)]
pub struct SharedTranslator(Arc<RwLock<Translator>>);

impl SharedTranslator {
    pub fn new(translator: Translator) -> Self {
        Self(Arc::new(RwLock::new(translator)))
    }

    pub fn get(&self) -> Translator {
        match self.0.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set(&self, translator: Translator) {
        match self.0.write() {
            Ok(mut guard) => *guard = translator,
            Err(poisoned) => *poisoned.into_inner() = translator,
        }
    }

    pub fn t(&self, key: TranslationKey) -> &'static str {
        self.get().t(key)
    }
}

impl Default for SharedTranslator {
    fn default() -> Self {
        Self::new(Translator::new(Locale::En))
    }
}

fn english(key: TranslationKey) -> &'static str {
    use TranslationKey as K;
    match key {
        K::PluginName => "Reminder Window Focus",
        K::EnableFocus => "Enable window focus on reminder",
        K::EnableFocusDesc => {
            "Automatically focus and bring Obsidian to front when reminder appears"
        }
        K::FocusInterval => "Minimum focus interval (seconds)",
        K::FocusIntervalDesc => "Minimum time between two consecutive window focus actions",
        K::DetectionInterval => "Detection interval (milliseconds)",
        K::DetectionIntervalDesc => {
            "How often to check for reminder modals (lower values = more responsive, higher CPU usage)"
        }
        K::Language => "Language",
        K::LanguageDesc => "Select display language for this plugin",
        K::DebugMode => "Debug mode",
        K::DebugModeDesc => "Enable detailed logging for troubleshooting (for developers)",
        K::Auto => "Auto",
        K::Chinese => "中文",
        K::English => "English",
        K::ReminderDetected => "Reminder detected, focusing window",
        K::FocusSkipped => "Window already active, skipping focus",
        K::FocusCooldown => "Focus on cooldown, skipping",
        K::SettingsSaved => "Settings saved successfully",
        K::InvalidInterval => "Please enter a valid number for focus interval (1 second or higher)",
        K::InvalidDetectionInterval => {
            "Please enter a valid number for detection interval (100ms or higher)"
        }
    }
}

fn chinese(key: TranslationKey) -> &'static str {
    use TranslationKey as K;
    match key {
        K::PluginName => "提醒窗口置顶",
        K::EnableFocus => "启用提醒窗口置顶",
        K::EnableFocusDesc => "当检测到提醒弹窗时，自动将 Obsidian 窗口置顶并聚焦",
        K::FocusInterval => "最小聚焦间隔（秒）",
        K::FocusIntervalDesc => "两次窗口置顶之间的最小时间间隔",
        K::DetectionInterval => "检测间隔（毫秒）",
        K::DetectionIntervalDesc => "检测提醒弹窗的频率（数值越小响应越快，但CPU占用越高）",
        K::Language => "语言",
        K::LanguageDesc => "选择插件的显示语言",
        K::DebugMode => "调试模式",
        K::DebugModeDesc => "启用详细日志记录用于故障排除（供开发者使用）",
        K::Auto => "自动",
        K::Chinese => "中文",
        K::English => "English",
        K::ReminderDetected => "检测到提醒，正在置顶窗口",
        K::FocusSkipped => "窗口已处于活动状态，跳过置顶",
        K::FocusCooldown => "聚焦冷却中，跳过置顶",
        K::SettingsSaved => "设置已成功保存",
        K::InvalidInterval => "请输入有效的聚焦间隔数字（1秒或更高）",
        K::InvalidDetectionInterval => "请输入有效的检测间隔数字（100毫秒或更高）",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_language_wins_over_locale() {
        assert_eq!(Locale::resolve(Language::En, Some("zh-CN")), Locale::En);
        assert_eq!(Locale::resolve(Language::Zh, Some("en-US")), Locale::Zh);
    }

    #[test]
    fn auto_follows_host_locale() {
        assert_eq!(Locale::resolve(Language::Auto, Some("zh-TW")), Locale::Zh);
    }

    #[test]
    fn host_locale_wins_over_process_locale() {
        let zh_env = || Some("zh_CN.UTF-8".to_string());
        assert_eq!(
            Locale::resolve_with(Language::Auto, Some("en-US"), zh_env),
            Locale::En
        );
        assert_eq!(
            Locale::resolve_with(Language::Auto, Some("zh-CN"), || Some("C".to_string())),
            Locale::Zh
        );
    }

    #[test]
    fn process_locale_is_used_without_host_locale() {
        assert_eq!(
            Locale::resolve_with(Language::Auto, None, || Some("zh_TW.UTF-8".to_string())),
            Locale::Zh
        );
        assert_eq!(
            Locale::resolve_with(Language::Auto, None, || Some("en_GB.UTF-8".to_string())),
            Locale::En
        );
        assert_eq!(Locale::resolve_with(Language::Auto, None, || None), Locale::En);
    }

    #[test]
    fn tables_differ_per_locale() {
        let en = Translator::new(Locale::En);
        let zh = Translator::new(Locale::Zh);
        assert_eq!(en.t(TranslationKey::SettingsSaved), "Settings saved successfully");
        assert_eq!(zh.t(TranslationKey::SettingsSaved), "设置已成功保存");
        assert_eq!(en.t(TranslationKey::English), zh.t(TranslationKey::English));
    }
}
