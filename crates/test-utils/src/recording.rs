use std::sync::{Arc, Mutex};

use mediaguard::device::DeviceRoot;
use mediaguard::notifier::{Category, Notifier, SharedNotifier};
use mediaguard::watch::SemanticEvent;

/// One call received by a [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Notice { category: Category, message: String },
    File { root: DeviceRoot, event: SemanticEvent },
}

/// A notifier that:
/// - keeps every call in order
/// - keeps file events structured (root + event) instead of formatted.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    records: Arc<Mutex<Vec<Record>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> SharedNotifier {
        Arc::new(self.clone())
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    /// Every file event, in delivery order, with its device.
    pub fn file_events(&self) -> Vec<(DeviceRoot, SemanticEvent)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::File { root, event } => Some((root, event)),
                Record::Notice { .. } => None,
            })
            .collect()
    }

    /// File events attributed to `root`, in delivery order.
    pub fn events_for(&self, root: &DeviceRoot) -> Vec<SemanticEvent> {
        self.file_events()
            .into_iter()
            .filter(|(r, _)| r == root)
            .map(|(_, e)| e)
            .collect()
    }

    /// Messages of every non-file notification in `category`.
    pub fn messages(&self, category: &Category) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Notice { category: c, message } if &c == category => Some(message),
                _ => None,
            })
            .collect()
    }

    /// How many notifications (any category) contain `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.records()
            .iter()
            .filter(|r| matches!(r, Record::Notice { message, .. } if message.contains(needle)))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, category: Category, message: &str) {
        self.records.lock().unwrap().push(Record::Notice {
            category,
            message: message.to_string(),
        });
    }

    fn file_event(&self, root: &DeviceRoot, event: &SemanticEvent) {
        self.records.lock().unwrap().push(Record::File {
            root: root.clone(),
            event: event.clone(),
        });
    }
}
