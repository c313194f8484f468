/// Host-supplied microphone permission check.
///
/// The permission system itself lives outside this crate; the session
/// only asks a yes/no question before a recording may start.
pub trait PermissionProbe: Send + Sync {
    fn has_microphone_permission(&self) -> bool;
}
