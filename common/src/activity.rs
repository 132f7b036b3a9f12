//! User-visible activity: typed pipeline events and the bounded log they feed.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::Digest;
use crate::transfer::TransferKind;

/// Entries kept in the activity log.
pub const ACTIVITY_LOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
    pub deploy_hash: Option<Digest>,
}

/// One step of a grant or redemption, in the order the submitter reaches them.
#[derive(Debug, Clone, PartialEq)]
pub enum TxEvent {
    Preparing {
        kind: TransferKind,
        amount: u64,
        reward: Option<String>,
    },
    SignatureRequested,
    SignatureReceived,
    Submitting,
    Submitted {
        kind: TransferKind,
        deploy_hash: Digest,
    },
    Failed {
        message: String,
    },
}

impl TxEvent {
    pub fn level(&self) -> LogLevel {
        match self {
            Self::Submitted { .. } => LogLevel::Success,
            Self::Failed { .. } => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    pub fn deploy_hash(&self) -> Option<Digest> {
        match self {
            Self::Submitted { deploy_hash, .. } => Some(*deploy_hash),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Preparing {
                reward: Some(name),
                amount,
                ..
            } => format!("📝 Preparing redeem for {name} ({amount} CFT)..."),
            Self::Preparing {
                kind: TransferKind::Redeem,
                amount,
                ..
            } => format!("📝 Preparing redeem ({amount} CFT)..."),
            Self::Preparing { amount, .. } => format!("📝 Preparing deploy to issue {amount} CFT..."),
            Self::SignatureRequested => "🔏 Requesting signature from Casper Wallet...".into(),
            Self::SignatureReceived => "✍️ Signature received".into(),
            Self::Submitting => "📡 Sending deploy to Casper Network...".into(),
            Self::Submitted {
                kind: TransferKind::Grant,
                ..
            } => "✅ Deploy sent successfully!".into(),
            Self::Submitted { .. } => "✅ Redeemed!".into(),
            Self::Failed { message } => format!("❌ {message}"),
        }
    }
}

/// Receives pipeline events as they happen.
pub trait EventSink {
    fn emit(&mut self, event: TxEvent);
}

impl EventSink for Vec<TxEvent> {
    fn emit(&mut self, event: TxEvent) {
        self.push(event);
    }
}

/// The last ten entries, most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>, level: LogLevel, deploy_hash: Option<Digest>) {
        self.push_entry(LogEntry {
            time: Utc::now(),
            message: message.into(),
            level,
            deploy_hash,
        });
    }

    pub fn push_entry(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(ACTIVITY_LOG_CAPACITY);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().take(n)
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl EventSink for ActivityLog {
    fn emit(&mut self, event: TxEvent) {
        self.push(event.message(), event.level(), event.deploy_hash());
    }
}
