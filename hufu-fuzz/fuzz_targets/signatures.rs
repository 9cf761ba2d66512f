#![no_main]

use std::sync::OnceLock;

use hufu::{
    Config, HuFu1,
    dsa::hufu::{PublicKey, SecretKey, Signature},
    utils::Deserializable,
};
use libfuzzer_sys::fuzz_target;

/// A fixed key pair, so that arbitrary signatures are checked against a well-formed key.
fn keys() -> &'static (PublicKey<HuFu1>, SecretKey<HuFu1>) {
    static KEYS: OnceLock<(PublicKey<HuFu1>, SecretKey<HuFu1>)> = OnceLock::new();
    KEYS.get_or_init(|| {
        hufu::dsa::hufu::keypair(&[0x5a; 32], &Config::default()).expect("fixed seed keygen")
    })
}

fuzz_target!(|data: &[u8]| {
    let (pk, _) = keys();

    // none of the decoders may panic on arbitrary input
    let _ = PublicKey::<HuFu1>::read_from_bytes(data);
    let _ = SecretKey::<HuFu1>::read_from_bytes(data);
    let _ = hufu::dsa::hufu::decompress::<HuFu1>(data);

    // verification must return false rather than panic
    if let Ok(sig) = Signature::<HuFu1>::read_from_bytes(data) {
        let _ = pk.verify_detailed(&sig);
    }

    // the first byte selects a message length for the padded form
    if let Some((&len, padded)) = data.split_first() {
        if let Ok(sig) = Signature::<HuFu1>::from_padded_bytes(padded, len as usize) {
            let _ = pk.verify(&sig);
        }
    }
});
