use std::fmt;

/// Where the credential lifecycle currently stands.
///
/// ```text
/// unauthenticated -> authorizing      (interactive flow started)
/// unauthenticated -> authorized       (cache hit)
/// unauthenticated -> refreshing       (cached token expired, refresh token present)
/// authorizing     -> authorized
/// authorizing     -> unauthenticated  (flow failed)
/// authorized      -> refreshing
/// authorized      -> unauthenticated  (expiry or logout)
/// refreshing      -> authorized
/// refreshing      -> unauthenticated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authorizing,
    Authorized,
    Refreshing,
}

impl AuthState {
    /// Whether `from -> to` is an edge of the graph above.
    pub fn is_valid_transition(from: AuthState, to: AuthState) -> bool {
        matches!(
            (from, to),
            (AuthState::Unauthenticated, AuthState::Authorizing)
                | (AuthState::Unauthenticated, AuthState::Authorized)
                | (AuthState::Unauthenticated, AuthState::Refreshing)
                | (AuthState::Authorizing, AuthState::Authorized)
                | (AuthState::Authorizing, AuthState::Unauthenticated)
                | (AuthState::Authorized, AuthState::Refreshing)
                | (AuthState::Authorized, AuthState::Unauthenticated)
                | (AuthState::Refreshing, AuthState::Authorized)
                | (AuthState::Refreshing, AuthState::Unauthenticated)
        )
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authorizing => "authorizing",
            Self::Authorized => "authorized",
            Self::Refreshing => "refreshing",
        };
        f.write_str(s)
    }
}

/// A transition outside the graph was attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid auth state transition: {from} -> {to}")]
pub struct AuthStateError {
    pub from: AuthState,
    pub to: AuthState,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AuthState; 4] = [
        AuthState::Unauthenticated,
        AuthState::Authorizing,
        AuthState::Authorized,
        AuthState::Refreshing,
    ];

    #[test]
    fn valid_edges() {
        use AuthState::*;
        assert!(AuthState::is_valid_transition(Unauthenticated, Authorizing));
        assert!(AuthState::is_valid_transition(Unauthenticated, Authorized));
        assert!(AuthState::is_valid_transition(Unauthenticated, Refreshing));
        assert!(AuthState::is_valid_transition(Authorizing, Authorized));
        assert!(AuthState::is_valid_transition(Authorized, Refreshing));
        assert!(AuthState::is_valid_transition(Refreshing, Authorized));
        assert!(AuthState::is_valid_transition(Refreshing, Unauthenticated));
    }

    #[test]
    fn invalid_edges() {
        use AuthState::*;
        assert!(!AuthState::is_valid_transition(Authorizing, Refreshing));
        assert!(!AuthState::is_valid_transition(Refreshing, Authorizing));
        assert!(!AuthState::is_valid_transition(Authorized, Authorizing));
    }

    #[test]
    fn self_loops_are_not_edges() {
        for state in ALL {
            assert!(!AuthState::is_valid_transition(state, state));
        }
    }

    #[test]
    fn every_state_can_reach_unauthenticated_or_is_it() {
        for state in ALL {
            assert!(
                state == AuthState::Unauthenticated
                    || AuthState::is_valid_transition(state, AuthState::Unauthenticated)
            );
        }
    }

    #[test]
    fn error_message_names_both_states() {
        let err = AuthStateError {
            from: AuthState::Refreshing,
            to: AuthState::Authorizing,
        };
        assert_eq!(
            err.to_string(),
            "invalid auth state transition: refreshing -> authorizing"
        );
    }
}
