//! Chat Page

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::components::{HistoryList, MessageBubble, Spinner};

const CREDENTIAL_PROMPT: &str = "Please enter your Groq API key to use the search chat.";

#[component]
pub fn ChatPage() -> impl IntoView {
    let (session_id, set_session_id) = signal(None::<String>);
    let (messages, set_messages) = signal(Vec::<api::ChatMessage>::new());
    let (has_key, set_has_key) = signal(false);
    let (api_key, set_api_key) = signal(String::new());
    let (result_count, set_result_count) = signal(3_u8);
    let (input, set_input) = signal(String::new());
    let (loading, set_loading) = signal(false);
    let (hint, set_hint) = signal(None::<String>);
    let (error, set_error) = signal(None::<String>);
    let (show_history, set_show_history) = signal(false);
    let (helpful, set_helpful) = signal(true);
    let (ack, set_ack) = signal(None::<String>);

    let apply = move |view: api::SessionView| {
        set_session_id.set(Some(view.id));
        set_messages.set(view.messages);
        set_has_key.set(view.has_api_key);
        set_result_count.set(view.result_count);
    };

    // One session per page load
    spawn_local(async move {
        match api::create_session().await {
            Ok(view) => apply(view),
            Err(e) => set_error.set(Some(e.error)),
        }
    });

    let push_settings = move |key: Option<String>, count: Option<u8>| {
        let Some(id) = session_id.get_untracked() else {
            return;
        };
        spawn_local(async move {
            match api::update_settings(&id, key, count).await {
                Ok(view) => apply(view),
                Err(e) => set_error.set(Some(e.error)),
            }
        });
    };

    let clear = move |_| {
        let Some(id) = session_id.get_untracked() else {
            return;
        };
        set_hint.set(None);
        spawn_local(async move {
            match api::reset(&id).await {
                Ok(view) => apply(view),
                Err(e) => set_error.set(Some(e.error)),
            }
        });
    };

    let send = move |()| {
        let msg = input.get_untracked();
        if msg.trim().is_empty() || loading.get_untracked() {
            return;
        }
        let Some(id) = session_id.get_untracked() else {
            return;
        };

        // Show the question right away; the server view replaces it.
        set_messages.update(|msgs| {
            msgs.push(api::ChatMessage {
                role: "user".into(),
                content: msg.clone(),
                timestamp: None,
            });
        });
        set_input.set(String::new());
        set_hint.set(None);
        set_error.set(None);
        set_loading.set(true);

        spawn_local(async move {
            match api::send_chat(&id, &msg).await {
                Ok(reply) => {
                    set_hint.set(reply.hint);
                    apply(reply.session);
                }
                Err(e) if e.is_missing_key() => {
                    set_has_key.set(false);
                    set_messages.update(|msgs| {
                        msgs.pop();
                    });
                }
                Err(e) => set_error.set(Some(e.error)),
            }
            set_loading.set(false);
        });
    };

    let submit_feedback = move |_| {
        let Some(id) = session_id.get_untracked() else {
            return;
        };
        let choice = helpful.get_untracked();
        spawn_local(async move {
            match api::send_feedback(&id, choice).await {
                Ok(text) => set_ack.set(Some(text)),
                Err(e) => set_error.set(Some(e.error)),
            }
        });
    };

    view! {
        <div class="chat">
            <aside class="sidebar">
                <h2>"⚙ Settings"</h2>
                <div class="field">
                    <label>"🔑 Enter your Groq API Key:"</label>
                    <input
                        type="password"
                        autocomplete="off"
                        prop:value=move || api_key.get()
                        on:input=move |ev| set_api_key.set(event_target_value(&ev))
                        on:change=move |ev| push_settings(Some(event_target_value(&ev)), None)
                    />
                </div>

                <Show when=move || has_key.get()>
                    <div class="field">
                        <label>{move || format!("📊 Number of Results: {}", result_count.get())}</label>
                        <input
                            type="range"
                            min="1"
                            max="5"
                            step="1"
                            prop:value=move || result_count.get().to_string()
                            on:change=move |ev| {
                                let count = event_target_value(&ev).parse().unwrap_or(3);
                                push_settings(None, Some(count));
                            }
                        />
                    </div>

                    <button class="btn" on:click=clear>"Clear Chat History"</button>

                    <label class="checkbox">
                        <input
                            type="checkbox"
                            prop:checked=move || show_history.get()
                            on:change=move |ev| set_show_history.set(event_target_checked(&ev))
                        />
                        "Show Chat History"
                    </label>
                    <Show when=move || show_history.get()>
                        <HistoryList messages=messages />
                    </Show>

                    <div class="feedback">
                        <h3>"👍 Your Feedback"</h3>
                        <p>"Was the response helpful?"</p>
                        <label>
                            <input
                                type="radio"
                                name="feedback"
                                prop:checked=move || helpful.get()
                                on:change=move |_| set_helpful.set(true)
                            />
                            "Yes"
                        </label>
                        <label>
                            <input
                                type="radio"
                                name="feedback"
                                prop:checked=move || !helpful.get()
                                on:change=move |_| set_helpful.set(false)
                            />
                            "No"
                        </label>
                        <button class="btn" on:click=submit_feedback>"Submit Feedback"</button>
                        {move || ack.get().map(|text| view! { <p class="ack">{text}</p> })}
                    </div>
                </Show>
            </aside>

            <section class="chat-main">
                <Show
                    when=move || has_key.get()
                    fallback=|| view! { <p class="credential-prompt">{CREDENTIAL_PROMPT}</p> }
                >
                    <h1>"🔎 AI Chat Assistant"</h1>
                    <p class="intro">
                        "Welcome to the search chat! This chatbot can search the web and provide answers using multiple sources."
                    </p>

                    <div class="messages">
                        <For
                            each=move || messages.get().into_iter().enumerate()
                            key=|(i, msg)| (*i, msg.content.len())
                            children=move |(_, msg)| view! { <MessageBubble message=msg /> }
                        />
                        <Show when=move || loading.get()>
                            <Spinner />
                        </Show>
                        {move || hint.get().map(|text| view! { <p class="hint">{text}</p> })}
                    </div>

                    <div class="input-area">
                        <input
                            type="text"
                            placeholder="Ask me anything..."
                            prop:value=move || input.get()
                            on:input=move |ev| set_input.set(event_target_value(&ev))
                            on:keydown=move |ev| {
                                if ev.key() == "Enter" {
                                    ev.prevent_default();
                                    send(());
                                }
                            }
                        />
                        <button on:click=move |_| send(()) disabled=move || loading.get()>
                            {move || if loading.get() { "..." } else { "Send" }}
                        </button>
                    </div>
                </Show>
                {move || error.get().map(|text| view! { <p class="error">{text}</p> })}
            </section>
        </div>
    }
}
