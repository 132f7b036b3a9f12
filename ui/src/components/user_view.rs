use dioxus::prelude::*;

use fidelity_client::privacy::PrivacySettings;
use fidelity_common::catalog::{Reward, RewardProgress, REWARDS};
use fidelity_common::PublicKey;

use super::activity_log::ActivityLogView;
use super::app::{DashboardAction, SessionAction};
use super::shared_state::{use_handles, use_view_state};

#[component]
pub fn UserView(account: PublicKey, balance: i64) -> Element {
    let handles = use_handles();
    let session_actions = use_coroutine_handle::<SessionAction>();
    let mut privacy = use_signal(|| PrivacySettings::load(handles.store.storage(), &account));
    let settings = *privacy.read();

    // Saved per account; the write-through is best effort.
    let store = handles.store.clone();
    let mut update = move |change: fn(&mut PrivacySettings)| {
        let mut next = *privacy.peek();
        change(&mut next);
        if let Err(e) = next.save(store.storage(), &account) {
            tracing::warn!(error = %e, "privacy settings not saved");
        }
        privacy.set(next);
    };
    let mut toggle_encryption = update.clone();
    let mut toggle_transactions = update.clone();

    rsx! {
        div { class: "panel user-view",
            div { class: "panel-header",
                div { class: "panel-icon", "🎁" }
                div {
                    h3 { "Redeem Rewards" }
                    p { "Spend your points responsibly" }
                }
                div { class: "balance",
                    if settings.show_balance { "{balance} CFT" } else { "•••• CFT" }
                }
            }

            div { class: "reward-grid",
                for reward in REWARDS.iter() {
                    RewardCard { key: "{reward.id}", reward: *reward, balance }
                }
            }
            p { class: "panel-footer", "Transaction validates via Smart Contract" }

            if settings.show_transactions {
                ActivityLogView { limit: 10 }
            }

            div { class: "privacy-settings",
                h3 { "Privacy Settings" }
                label {
                    input {
                        r#type: "checkbox",
                        checked: settings.encryption,
                        onchange: move |_| {
                            toggle_encryption(|s| s.encryption = !s.encryption);
                            session_actions.send(SessionAction::Encryption(privacy.peek().encryption));
                        },
                    }
                    " Data Encryption"
                }
                label {
                    input {
                        r#type: "checkbox",
                        checked: settings.show_balance,
                        onchange: move |_| update(|s| s.show_balance = !s.show_balance),
                    }
                    " Show Balance"
                }
                label {
                    input {
                        r#type: "checkbox",
                        checked: settings.show_transactions,
                        onchange: move |_| toggle_transactions(|s| s.show_transactions = !s.show_transactions),
                    }
                    " Show Transaction History"
                }
            }
        }
    }
}

#[component]
fn RewardCard(reward: Reward, balance: i64) -> Element {
    let actions = use_coroutine_handle::<DashboardAction>();
    let busy = *use_view_state().busy.read();
    let progress = RewardProgress::new(balance, reward.cost);

    rsx! {
        div { class: if progress.can_afford { "reward-card affordable" } else { "reward-card locked" },
            div { class: "reward-icon", "{reward.icon}" }
            div { class: "reward-body",
                h4 { "{reward.name}" }
                p { "{reward.description}" }
                span { class: "reward-cost", "{reward.cost} CFT" }
            }
            button {
                disabled: busy || !progress.can_afford,
                onclick: move |_| actions.send(DashboardAction::Redeem { reward_id: reward.id }),
                if busy {
                    "Processing..."
                } else if progress.can_afford {
                    "Redeem"
                } else {
                    "Locked"
                }
            }
            if !progress.can_afford {
                div { class: "reward-progress",
                    span { "Need {progress.missing} more CFT" }
                    div { class: "progress-bar",
                        div { class: "progress-fill", style: "width: {progress.percent}%" }
                    }
                    span { "{progress.percent}% to unlock" }
                }
            }
        }
    }
}
