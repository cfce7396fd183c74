use chrono::Local;

use crate::event::PuzzleEvent;
use crate::store::SolveDb;
use crate::util::new_id;

/// A named grouping of solves.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub name: String,
}

/// Load the session the user left off in, or create today's. A stored id
/// that no longer resolves falls through to creation, so a wiped database
/// heals on the next start.
pub fn ensure_session(db: &SolveDb, stored_id: Option<&str>) -> rusqlite::Result<Session> {
    if let Some(id) = stored_id {
        if let Some(session) = db.find_session(id)? {
            return Ok(session);
        }
    }

    let session = Session {
        id: new_id(),
        name: format!("Session {}", Local::now().format("%Y-%m-%d")),
    };
    db.insert_session(&session)?;
    Ok(session)
}

/// What changed in the selection, handed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionChange {
    Event(PuzzleEvent),
    Session(String),
}

/// The currently selected event and session.
///
/// A single instance owned by the app replaces what a browser timer would
/// keep in ambient storage; interested parts subscribe for change
/// notification instead of reading a global.
pub struct Selection {
    event: PuzzleEvent,
    session_id: String,
    listeners: Vec<(usize, Box<dyn FnMut(&SelectionChange)>)>,
    next_token: usize,
}

impl Selection {
    pub fn new(event: PuzzleEvent, session_id: String) -> Self {
        Self {
            event,
            session_id,
            listeners: Vec::new(),
            next_token: 0,
        }
    }

    pub fn event(&self) -> PuzzleEvent {
        self.event
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Registers a change listener; the token unsubscribes it. Listeners
    /// must not mutate the selection reentrantly.
    pub fn subscribe(&mut self, listener: Box<dyn FnMut(&SelectionChange)>) -> usize {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners.push((token, listener));
        token
    }

    pub fn unsubscribe(&mut self, token: usize) {
        self.listeners.retain(|(t, _)| *t != token);
    }

    pub fn set_event(&mut self, event: PuzzleEvent) {
        if self.event == event {
            return;
        }
        self.event = event;
        self.notify(SelectionChange::Event(event));
    }

    pub fn set_session(&mut self, session_id: String) {
        if self.session_id == session_id {
            return;
        }
        self.session_id = session_id.clone();
        self.notify(SelectionChange::Session(session_id));
    }

    fn notify(&mut self, change: SelectionChange) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in &mut listeners {
            listener(&change);
        }
        self.listeners = listeners;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn ensure_session_returns_the_stored_session() {
        let db = SolveDb::open_in_memory().unwrap();
        let existing = Session {
            id: "abc".to_string(),
            name: "main".to_string(),
        };
        db.insert_session(&existing).unwrap();

        let session = ensure_session(&db, Some("abc")).unwrap();
        assert_eq!(session, existing);
    }

    #[test]
    fn ensure_session_creates_when_missing_or_dangling() {
        let db = SolveDb::open_in_memory().unwrap();
        let fresh = ensure_session(&db, None).unwrap();
        assert!(fresh.name.starts_with("Session "));
        assert!(db.find_session(&fresh.id).unwrap().is_some());

        let healed = ensure_session(&db, Some("gone")).unwrap();
        assert_ne!(healed.id, "gone");
    }

    #[test]
    fn selection_notifies_subscribers_on_change() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut selection = Selection::new(PuzzleEvent::Cube333, "s1".to_string());
        selection.subscribe(Box::new(move |change| sink.borrow_mut().push(change.clone())));

        selection.set_event(PuzzleEvent::Cube222);
        selection.set_session("s2".to_string());

        assert_eq!(
            *seen.borrow(),
            vec![
                SelectionChange::Event(PuzzleEvent::Cube222),
                SelectionChange::Session("s2".to_string()),
            ]
        );
    }

    #[test]
    fn setting_the_same_value_does_not_notify() {
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let mut selection = Selection::new(PuzzleEvent::Cube333, "s1".to_string());
        selection.subscribe(Box::new(move |_| *sink.borrow_mut() += 1));

        selection.set_event(PuzzleEvent::Cube333);
        selection.set_session("s1".to_string());
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let mut selection = Selection::new(PuzzleEvent::Cube333, "s1".to_string());
        let token = selection.subscribe(Box::new(move |_| *sink.borrow_mut() += 1));

        selection.unsubscribe(token);
        selection.set_event(PuzzleEvent::Cube222);
        assert_eq!(*count.borrow(), 0);
    }
}
