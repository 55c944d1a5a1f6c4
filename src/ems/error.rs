use super::port::DeviceRole;

/// Fatal EMS failures. None of these are retried; the driver halts the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmsError {
    /// The port wiring is inconsistent (detected once, when the table is built).
    #[error("configuration error: {role} input with weight {weight}: {reason}")]
    Configuration {
        role: DeviceRole,
        weight: u32,
        reason: String,
    },
    /// The configured allocation strategy is not recognised.
    #[error("unknown allocation strategy \"{0}\", expected \"sequential\" or \"tie-group\"")]
    UnknownStrategy(String),
    /// A tie-group share was about to be divided by a member count of zero.
    #[error("tie group at weight {weight} has no members left in round {round}")]
    EmptyTieGroup { weight: u32, round: usize },
}
