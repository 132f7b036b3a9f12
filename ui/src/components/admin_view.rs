use dioxus::prelude::*;

use fidelity_client::dashboard::{QUICK_TEST_AMOUNT, QUICK_TEST_RECIPIENT};

use super::activity_log::ActivityLogView;
use super::app::DashboardAction;
use super::shared_state::use_view_state;

#[component]
pub fn AdminView() -> Element {
    let actions = use_coroutine_handle::<DashboardAction>();
    let busy = *use_view_state().busy.read();
    let mut customer_addr = use_signal(String::new);
    let mut amount = use_signal(String::new);

    let submit = move |evt: FormEvent| {
        evt.prevent_default();
        actions.send(DashboardAction::Issue {
            recipient: customer_addr.read().clone(),
            amount: amount.read().clone(),
        });
        customer_addr.set(String::new());
        amount.set(String::new());
    };

    rsx! {
        div { class: "panel admin-view",
            div { class: "panel-header",
                div { class: "panel-icon", "💰" }
                div {
                    h3 { "Issue Points" }
                    p { "Send CFT tokens to any user" }
                }
                button {
                    class: "quick-test",
                    onclick: move |_| {
                        customer_addr.set(QUICK_TEST_RECIPIENT.to_string());
                        amount.set(QUICK_TEST_AMOUNT.to_string());
                    },
                    "⚡ Quick Test: {QUICK_TEST_AMOUNT} CFT"
                }
            }

            form { onsubmit: submit,
                div { class: "form-group",
                    label { "Customer Address" }
                    input {
                        r#type: "text",
                        placeholder: "Public Key (01...)",
                        value: "{customer_addr}",
                        oninput: move |evt| customer_addr.set(evt.value()),
                    }
                }
                div { class: "form-group",
                    label { "Amount (CFT)" }
                    input {
                        r#type: "number",
                        placeholder: "100",
                        value: "{amount}",
                        oninput: move |evt| amount.set(evt.value()),
                    }
                }
                button {
                    r#type: "submit",
                    disabled: busy,
                    if busy { "Processing..." } else { "Issue Points" }
                }
            }

            ActivityLogView { limit: 3 }
        }
    }
}
