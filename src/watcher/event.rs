//! Raw change notifications.
//!
//! Facilities translate whatever their backend delivers into [`RawEvent`]s,
//! which is the only form the rest of the watcher sees.

use std::ffi::OsString;

use bitflags::bitflags;

use super::WatchHandle;

bitflags! {
    /// Change kinds carried by a notification. Values follow the inotify ABI.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeKind: u32 {
        const MODIFY = 0x0000_0002;
        const ATTRIB = 0x0000_0004;
        const MOVED_FROM = 0x0000_0040;
        const MOVED_TO = 0x0000_0080;
        const CREATE = 0x0000_0100;
        const DELETE = 0x0000_0200;
        const DELETE_SELF = 0x0000_0400;
        const MOVE_SELF = 0x0000_0800;
        const Q_OVERFLOW = 0x0000_4000;
        const IGNORED = 0x0000_8000;
        const IS_DIR = 0x4000_0000;

        /// Mask installed on every watched directory.
        const WATCHED = Self::ATTRIB.bits()
            | Self::CREATE.bits()
            | Self::DELETE.bits()
            | Self::DELETE_SELF.bits()
            | Self::MODIFY.bits()
            | Self::MOVE_SELF.bits()
            | Self::MOVED_FROM.bits()
            | Self::MOVED_TO.bits();
    }
}

/// Description phrases, in the order they are appended.
const PHRASES: [(ChangeKind, &str); 8] = [
    (ChangeKind::ATTRIB, "'s metadata changed"),
    (ChangeKind::CREATE, " was created in a watched directory"),
    (ChangeKind::DELETE, " was deleted in a watched directory"),
    (
        ChangeKind::DELETE_SELF,
        ", the watched file/directory, was itself deleted",
    ),
    (ChangeKind::MODIFY, " was modified"),
    (
        ChangeKind::MOVE_SELF,
        ", the watched file/directory, was itself moved",
    ),
    (ChangeKind::MOVED_FROM, " was moved out of a watched directory"),
    (ChangeKind::MOVED_TO, " was moved into a watched directory"),
];

impl ChangeKind {
    pub fn is_dir(self) -> bool {
        self.contains(ChangeKind::IS_DIR)
    }

    /// A directory appeared inside a watched directory.
    pub fn is_dir_arrival(self) -> bool {
        self.is_dir() && self.intersects(ChangeKind::CREATE | ChangeKind::MOVED_TO)
    }

    /// A directory left a watched directory.
    pub fn is_dir_departure(self) -> bool {
        self.is_dir() && self.intersects(ChangeKind::DELETE | ChangeKind::MOVED_FROM)
    }

    /// Append the phrase for every change kind present.
    pub fn describe(self, subject: &str) -> String {
        let mut description = subject.to_string();
        for (kind, phrase) in PHRASES {
            if self.contains(kind) {
                description.push_str(phrase);
            }
        }
        description
    }
}

/// One notification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Watched directory the event occurred in.
    pub handle: WatchHandle,
    pub kind: ChangeKind,
    /// Affected child entry; `None` for events on the directory itself.
    /// Kept as raw bytes so names that are not UTF-8 still resolve on disk.
    pub name: Option<OsString>,
}

impl RawEvent {
    pub fn new(handle: WatchHandle, kind: ChangeKind, name: Option<&str>) -> Self {
        Self {
            handle,
            kind,
            name: name.map(OsString::from),
        }
    }

    /// Record for a child entry whose name need not be UTF-8.
    pub fn named(handle: WatchHandle, kind: ChangeKind, name: impl Into<OsString>) -> Self {
        Self {
            handle,
            kind,
            name: Some(name.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_appends_every_phrase_in_order() {
        let kind = ChangeKind::ATTRIB | ChangeKind::MODIFY | ChangeKind::MOVED_TO;
        assert_eq!(
            kind.describe("notes.md"),
            "notes.md's metadata changed was modified was moved into a watched directory"
        );
        assert_eq!(
            ChangeKind::DELETE_SELF.describe("/data/drive"),
            "/data/drive, the watched file/directory, was itself deleted"
        );
    }

    #[test]
    fn test_directory_predicates() {
        assert!((ChangeKind::MOVED_TO | ChangeKind::IS_DIR).is_dir_arrival());
        assert!(!ChangeKind::CREATE.is_dir_arrival());
        assert!((ChangeKind::DELETE | ChangeKind::IS_DIR).is_dir_departure());
        assert!(!(ChangeKind::MODIFY | ChangeKind::IS_DIR).is_dir_departure());
    }

    #[test]
    fn test_unknown_bits_are_ignored() {
        let kind = ChangeKind::from_bits_truncate(ChangeKind::MODIFY.bits() | 0x0100_0000);
        assert_eq!(kind, ChangeKind::MODIFY);
    }

    #[test]
    fn test_named_keeps_name_bytes() {
        let event = RawEvent::named(WatchHandle::new(1), ChangeKind::CREATE, "photos");
        assert_eq!(
            event,
            RawEvent::new(WatchHandle::new(1), ChangeKind::CREATE, Some("photos"))
        );
    }
}
