use std::fmt;

/// A registry change notification carrying the entity as it looked when
/// the change was observed. `Delete` holds the last known state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T> {
    Add(T),
    Update(T),
    Delete(T),
}

/// The kind of change, without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Add,
    Update,
    Delete,
}

impl<T> Event<T> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Add(_) => EventKind::Add,
            Event::Update(_) => EventKind::Update,
            Event::Delete(_) => EventKind::Delete,
        }
    }

    pub fn entity(&self) -> &T {
        match self {
            Event::Add(e) | Event::Update(e) | Event::Delete(e) => e,
        }
    }

    pub fn into_entity(self) -> T {
        match self {
            Event::Add(e) | Event::Update(e) | Event::Delete(e) => e,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Add => "add",
            EventKind::Update => "update",
            EventKind::Delete => "delete",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_and_payload() {
        let ev = Event::Delete("svc".to_string());
        assert_eq!(ev.kind(), EventKind::Delete);
        assert_eq!(ev.entity(), "svc");
        assert_eq!(ev.kind().to_string(), "delete");
        assert_eq!(Event::Add(1).kind().to_string(), "add");
        assert_eq!(Event::Update(1).into_entity(), 1);
    }
}
