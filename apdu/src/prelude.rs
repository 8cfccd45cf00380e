//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    hash_input::{
        HashInputStartFrame, HashOutputFrame, HashSignReq, InputMode, OutputFrameKind,
        SigHashType,
    },
    message::{MessageSignature, SignMessageFrame, SignMessageSignReq},
    path::Bip32Path,
    public_key::{AddressFormat, WalletPublicKeyReq, WalletPublicKeyResp},
    status::StatusWord,
    trusted_input::TrustedInputFrame,
    FramePosition,
};
