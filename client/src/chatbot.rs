use gloo_timers::callback::Timeout;
use icewatch_shared::chat::{ChatSession, chat_error_message, is_user_line};
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::app::input_value;

const GREETING: &str = "Hi! Ask me about sea-ice coverage, trends, or the prediction model.";

/// Floating assistant: a 💬 button that opens a chat panel.
#[component]
pub fn FloatingChatbot() -> impl IntoView {
    let is_open = RwSignal::new(false);
    let input = RwSignal::new(String::new());
    let session = RwSignal::new(ChatSession::default());
    let list_ref = NodeRef::<leptos::html::Div>::new();

    let loading = move || session.with(ChatSession::is_loading);

    let send = move || {
        let text = input.get_untracked();
        let Some((ticket, message)) = session.try_update(|s| s.begin_send(&text)).flatten() else {
            return;
        };
        input.set(String::new());
        spawn_local(async move {
            match api::send_chat_message(&message).await {
                Ok(resp) => {
                    session.try_update(|s| s.settle_reply(ticket, resp));
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("chat request failed: {e}").into());
                    let msg = chat_error_message(e.status());
                    session.try_update(|s| s.settle_error(ticket, msg));
                }
            }
        });
    };

    // Keep the newest line in view once the DOM has caught up.
    Effect::new(move || {
        session.track();
        is_open.track();
        Timeout::new(0, move || {
            if let Some(el) = list_ref.get_untracked() {
                el.set_scroll_top(el.scroll_height());
            }
        })
        .forget();
    });

    on_cleanup(move || {
        session.try_update(ChatSession::cancel);
    });

    let transcript = move || {
        session.with(|s| {
            s.lines()
                .iter()
                .map(|line| {
                    let (align, background) = if is_user_line(line) {
                        ("flex-end", "#282c3e")
                    } else {
                        ("flex-start", "#1a1d2a")
                    };
                    view! {
                        <div
                            style:align-self=align
                            style:background=background
                            style="max-width: 85%; border-radius: 6px; padding: 6px 9px; color: #e2e0d8; font-size: 0.74rem; line-height: 1.4; white-space: pre-wrap;"
                        >
                            {line.clone()}
                        </div>
                    }
                })
                .collect::<Vec<_>>()
        })
    };

    let note = move || {
        session
            .with(|s| s.note().map(str::to_string))
            .map(|note| view! { <div style="color: #f5c542; font-size: 0.66rem;">{note}</div> })
    };
    let error = move || {
        session
            .with(|s| s.error().map(str::to_string))
            .map(|error| view! { <div style="color: #ff6b6b; font-size: 0.7rem;">{error}</div> })
    };

    view! {
        <div style="position: absolute; right: 16px; bottom: 84px; z-index: 15; display: flex; flex-direction: column; align-items: flex-end; gap: 10px; font-family: 'Inter', system-ui, sans-serif;">
            <div
                style:display=move || if is_open.get() { "flex" } else { "none" }
                style="width: 320px; max-height: 420px; flex-direction: column; background: #13151f; border: 1px solid #282c3e; border-radius: 10px; box-shadow: 0 8px 24px rgba(0, 0, 0, 0.45); overflow: hidden;"
            >
                <div style="padding: 10px 12px; border-bottom: 1px solid #282c3e;">
                    <div style="color: #e2e0d8; font-size: 0.85rem; font-weight: 700;">
                        "Arctic AI Assistant"
                    </div>
                    <div style="color: #9a9590; font-size: 0.68rem;">
                        "Ask about ice coverage and predictions."
                    </div>
                </div>
                <div
                    node_ref=list_ref
                    style="flex: 1; min-height: 160px; overflow-y: auto; display: flex; flex-direction: column; gap: 6px; padding: 10px 12px;"
                >
                    <Show when=move || session.with(|s| s.lines().is_empty())>
                        <div style="color: #5a5860; font-size: 0.72rem;">{GREETING}</div>
                    </Show>
                    {transcript}
                    <Show when=loading>
                        <div style="align-self: flex-start; color: #9a9590; font-size: 0.9rem; letter-spacing: 0.2em;">
                            "•••"
                        </div>
                    </Show>
                    {note}
                    {error}
                </div>
                <div style="display: flex; gap: 6px; padding: 8px 10px; border-top: 1px solid #282c3e;">
                    <input
                        type="text"
                        placeholder="Ask about ice conditions…"
                        style="flex: 1; background: #1a1d2a; border: 1px solid #282c3e; border-radius: 4px; color: #e2e0d8; font-size: 0.74rem; padding: 6px 8px; outline: none;"
                        prop:value=move || input.get()
                        on:input=move |e| input.set(input_value(&e))
                        on:keydown=move |e: web_sys::KeyboardEvent| {
                            if e.key() == "Enter" {
                                e.prevent_default();
                                send();
                            }
                        }
                    />
                    <button
                        type="button"
                        aria-label="Send"
                        disabled=move || loading() || input.with(|text| text.trim().is_empty())
                        style="background: #4bd7ff; border: none; border-radius: 4px; color: #0c0e17; font-weight: 700; padding: 0 10px; cursor: pointer;"
                        on:click=move |_| send()
                    >
                        "➜"
                    </button>
                </div>
            </div>
            <button
                type="button"
                aria-label="Open assistant"
                style="width: 48px; height: 48px; border-radius: 50%; background: #1a1d2a; border: 1px solid #3a3f5c; font-size: 1.3rem; cursor: pointer; box-shadow: 0 4px 12px rgba(0, 0, 0, 0.4);"
                on:click=move |_| is_open.update(|open| *open = !*open)
            >
                "💬"
            </button>
        </div>
    }
}
