use dioxus::prelude::*;

use fidelity_common::activity::LogLevel;

use super::shared_state::{use_handles, use_view_state};

/// Most recent activity first, at most `limit` entries.
#[component]
pub fn ActivityLogView(limit: usize) -> Element {
    let handles = use_handles();
    let logs = use_view_state().logs;
    let entries: Vec<_> = logs.read().iter().take(limit).cloned().collect();

    if entries.is_empty() {
        return rsx! {};
    }

    rsx! {
        div { class: "activity-log",
            p { class: "activity-log-title", "Activity Log" }
            for (idx, entry) in entries.into_iter().enumerate() {
                div {
                    key: "{idx}",
                    class: match entry.level {
                        LogLevel::Error => "log-entry error",
                        LogLevel::Success => "log-entry success",
                        LogLevel::Info => "log-entry info",
                    },
                    span { class: "log-time",
                        {entry.time.with_timezone(&chrono::Local).format("%H:%M:%S").to_string()}
                    }
                    "{entry.message}"
                    if let Some(hash) = entry.deploy_hash {
                        a {
                            class: "log-link",
                            href: handles.config.explorer_link(&hash),
                            target: "_blank",
                            " View on explorer"
                        }
                    }
                }
            }
        }
    }
}
