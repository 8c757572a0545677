//! Cache Key Derivation
//!
//! Turns a call (a target identity plus its arguments) into a
//! deterministic byte-string cache key.

use sha2::{Digest, Sha256};

// == Key Args Trait ==
/// Canonical textual representation of a call's logical arguments.
///
/// One string per argument, in call order. Named arguments are expressed by
/// an implementor emitting `name=value` parts. The list must already be the
/// *logical* argument list: a receiver (`self`-style) argument is stripped
/// by the call site, so the cache is keyed by call shape rather than by
/// receiver identity.
///
/// Determinism is the implementor's responsibility: arguments whose textual
/// representation is unstable across runs (unordered collections without a
/// canonical order) make the derived key unstable across processes.
pub trait KeyArgs {
    /// Returns the canonical representation of each argument.
    fn key_parts(&self) -> Vec<String>;
}

impl KeyArgs for () {
    fn key_parts(&self) -> Vec<String> {
        Vec::new()
    }
}

macro_rules! impl_key_args_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: std::fmt::Debug),+> KeyArgs for ($($name,)+) {
            fn key_parts(&self) -> Vec<String> {
                vec![$(format!("{:?}", self.$idx)),+]
            }
        }
    };
}

impl_key_args_for_tuple!(A0: 0);
impl_key_args_for_tuple!(A0: 0, A1: 1);
impl_key_args_for_tuple!(A0: 0, A1: 1, A2: 2);
impl_key_args_for_tuple!(A0: 0, A1: 1, A2: 2, A3: 3);

// == Key Maker Trait ==
/// Turns a call into a cache key.
///
/// Must be deterministic for identical inputs; keys are exact-match lookup
/// tokens with no partial matching.
pub trait KeyMaker: Send + Sync {
    /// Derives a key from the target identity (conventionally
    /// `"module:qualified_name"`) and the canonical argument parts.
    fn make_key(&self, target: &str, parts: &[String]) -> Vec<u8>;
}

// == Repr Key Maker ==
/// Reference key maker building `"<target>(<p1>, <p2>, ...)"` keys.
///
/// Two independent post-processing hooks:
/// - `hash_args` replaces the argument substring with its SHA-256 hex
///   digest before embedding, bounding key size at the cost of readability;
/// - `hash_key` replaces the entire finished key with its SHA-256 hex
///   digest, yielding fixed-length keys with no collision guarantee
///   stronger than the hash function's.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReprKeyMaker {
    hash_args: bool,
    hash_key: bool,
}

impl ReprKeyMaker {
    /// Creates a key maker with both hashing hooks disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables hashing of the argument substring.
    pub fn hash_args(mut self) -> Self {
        self.hash_args = true;
        self
    }

    /// Enables hashing of the finished key.
    pub fn hash_key(mut self) -> Self {
        self.hash_key = true;
        self
    }
}

impl KeyMaker for ReprKeyMaker {
    fn make_key(&self, target: &str, parts: &[String]) -> Vec<u8> {
        let mut args = parts.join(", ");
        if self.hash_args {
            args = sha256_hex(args.as_bytes());
        }

        let key = format!("{}({})", target, args);
        if self.hash_key {
            sha256_hex(key.as_bytes()).into_bytes()
        } else {
            key.into_bytes()
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
