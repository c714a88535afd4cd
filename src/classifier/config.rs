/// Vocabulary and thresholds for the reminder classifier.
///
/// Everything here was tuned against the reminder dialog's markup across a few
/// releases of the component that renders it; none of it is a protocol
/// guarantee. Text vocabularies are matched against lowercased,
/// whitespace-collapsed text, so entries must be lowercase.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Class the host puts on every dialog wrapper
    pub container_class: String,

    /// "Reminder" in every supported language
    pub reminder_keywords: Vec<String>,
    /// Labels of the confirm/dismiss action
    pub done_labels: Vec<String>,
    /// Labels of the defer action
    pub snooze_labels: Vec<String>,
    /// Class names only the reminder dialog uses
    pub marker_classes: Vec<String>,
    /// Phrases that mark an `aria-label` as belonging to the dialog
    pub aria_markers: Vec<String>,
    /// Relative-time phrases offered by the snooze choices
    pub temporal_phrases: Vec<String>,

    /// Call-to-action button styling
    pub cta_class: String,
    /// Class of the snooze selection control
    pub select_class: String,
    /// Class of links pointing at notes
    pub file_link_classes: Vec<String>,
    /// Extension of the note files reminders live in
    pub file_extension: String,
    /// Attribute prefix left by the dialog's UI framework
    pub framework_data_prefix: String,
    /// Scoped class fragment left by the dialog's UI framework
    pub framework_class_fragment: String,

    /// Nodes visited below the candidate root before the scan stops
    pub max_scan_nodes: usize,
    /// Deepest level (relative to the root) the scan looks at
    pub max_scan_depth: usize,
    /// Characters kept in the text excerpt
    pub max_excerpt_chars: usize,
    /// Fallback textual rule only fires below this many characters of text
    pub max_fallback_text_chars: usize,
    /// Button-like descendants recorded
    pub max_buttons: usize,
    /// Root attributes kept in the summary
    pub max_attribute_summary: usize,
    /// Direct children included in the structural signature
    pub max_child_tags: usize,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            container_class: "modal-container".into(),
            reminder_keywords: words(&["reminder", "提醒"]),
            done_labels: words(&["done", "mark as done", "完成"]),
            snooze_labels: words(&["snooze", "remind me later", "稍后提醒", "推迟"]),
            marker_classes: words(&[
                "reminder-modal",
                "reminder-actions",
                "reminder-title",
                "reminder-file",
                "reminder-snooze",
            ]),
            aria_markers: words(&["reminder", "snooze", "提醒"]),
            temporal_phrases: words(&[
                "minutes",
                "hours",
                "tomorrow",
                "next week",
                "分钟",
                "小时",
                "明天",
                "下周",
            ]),
            cta_class: "mod-cta".into(),
            select_class: "dropdown".into(),
            file_link_classes: words(&["internal-link"]),
            file_extension: ".md".into(),
            framework_data_prefix: "data-svelte".into(),
            framework_class_fragment: "svelte-".into(),
            max_scan_nodes: 400,
            max_scan_depth: 12,
            max_excerpt_chars: 2000,
            max_fallback_text_chars: 2000,
            max_buttons: 16,
            max_attribute_summary: 8,
            max_child_tags: 8,
        }
    }
}
