use std::collections::VecDeque;

pub const TOAST_SECONDS: f32 = 2.0;
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub text: String,
    remaining: f32,
}

/// Short on-screen messages, newest last. Oldest are dropped past the cap.
#[derive(Debug, Default)]
pub struct Toasts {
    queue: VecDeque<Toast>,
}

impl Toasts {
    pub fn push(&mut self, text: impl Into<String>) {
        self.push_for(text, TOAST_SECONDS);
    }

    pub fn push_for(&mut self, text: impl Into<String>, seconds: f32) {
        if self.queue.len() == MAX_TOASTS {
            self.queue.pop_front();
        }
        self.queue.push_back(Toast {
            text: text.into(),
            remaining: seconds.max(0.0),
        });
    }

    pub fn tick(&mut self, dt_seconds: f32) {
        for toast in &mut self.queue {
            toast.remaining -= dt_seconds;
        }
        self.queue.retain(|toast| toast.remaining > 0.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_after_their_duration() {
        let mut toasts = Toasts::default();
        toasts.push("No route");
        toasts.push_for("Saved", 0.5);
        toasts.tick(1.0);
        let texts: Vec<&str> = toasts.iter().map(|toast| toast.text.as_str()).collect();
        assert_eq!(texts, vec!["No route"]);
        toasts.tick(1.5);
        assert!(toasts.is_empty());
    }

    #[test]
    fn oldest_toast_is_dropped_past_cap() {
        let mut toasts = Toasts::default();
        for index in 0..6 {
            toasts.push(format!("t{index}"));
        }
        assert_eq!(toasts.iter().count(), MAX_TOASTS);
        assert_eq!(toasts.iter().next().map(|toast| toast.text.as_str()), Some("t2"));
    }
}
