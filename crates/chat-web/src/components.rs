//! UI Components

use leptos::prelude::*;

use crate::api::ChatMessage;

/// Message bubble component
#[component]
pub fn MessageBubble(message: ChatMessage) -> impl IntoView {
    let class = if message.role == "user" {
        "chat-message user"
    } else {
        "chat-message assistant"
    };

    view! {
        <div class=class>
            <p class="content">{message.content}</p>
        </div>
    }
}

/// Sidebar listing of the conversation, numbered from 1
#[component]
pub fn HistoryList(messages: ReadSignal<Vec<ChatMessage>>) -> impl IntoView {
    view! {
        <div class="history">
            <h3>"Chat History"</h3>
            <ol class="history-list">
                {move || {
                    messages
                        .get()
                        .into_iter()
                        .enumerate()
                        .map(|(i, msg)| {
                            view! {
                                <li>{format!("{}: {} - {}", i + 1, msg.role, msg.content)}</li>
                            }
                        })
                        .collect_view()
                }}
            </ol>
        </div>
    }
}

/// Spinner shown while a turn runs
#[component]
pub fn Spinner() -> impl IntoView {
    view! {
        <div class="spinner">
            <span class="dot"></span>
            "Processing your request..."
        </div>
    }
}
