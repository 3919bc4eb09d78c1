use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random alphanumeric suffix for collision-free temp file names.
pub(crate) fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
