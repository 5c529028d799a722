use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued fetch.
///
/// Tokens are issued in strictly increasing order, so the latest token is
/// also the largest one ever handed out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

/// Monotonic token source plus the staleness check.
///
/// A completion may be applied only while its token is still the latest
/// issued one. Shared between the coordinator and fetch tasks, hence atomic.
#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: AtomicU64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token, invalidating every earlier one.
    pub fn issue(&self) -> Request {
        Request(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn latest(&self) -> Option<Request> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            n => Some(Request(n)),
        }
    }

    pub fn is_latest(&self, request: Request) -> bool {
        self.latest() == Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::{Request, RequestTokens};

    #[test]
    fn tokens_increase_and_supersede() {
        let tokens = RequestTokens::new();
        assert_eq!(tokens.latest(), None);

        let a = tokens.issue();
        assert!(tokens.is_latest(a));
        let b = tokens.issue();
        assert!(b > a);
        assert!(!tokens.is_latest(a));
        assert!(tokens.is_latest(b));
        assert_eq!(tokens.latest(), Some(b));
    }

    #[test]
    fn unissued_token_is_never_latest() {
        let tokens = RequestTokens::new();
        assert!(!tokens.is_latest(Request(0)));
        tokens.issue();
        assert!(!tokens.is_latest(Request(7)));
    }
}
