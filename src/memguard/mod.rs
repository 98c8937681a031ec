mod bytes;

pub use self::bytes::SecretBytes;
