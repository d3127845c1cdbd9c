//! Crypto engine: the only code that ever touches the secret.

use core::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Block};

use crate::error::CryptoError;

pub const BLOCK_SIZE: usize = 16;

/// One AES block, owned by the task and lent to the kernel for a syscall.
pub type DataBlock = [u8; BLOCK_SIZE];

/// The device key. Not `Clone`, not `Copy`, and its `Debug` is redacted:
/// the only way out is as key material inside a ciphertext.
pub struct Secret([u8; 16]);

impl Secret {
    pub const fn new(key: [u8; 16]) -> Self {
        Self(key)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// M-mode only: lives inside the kernel, which lives in `.kernel_secret`.
#[derive(Debug)]
pub struct CryptoEngine {
    secret: Secret,
}

impl CryptoEngine {
    pub const fn new(secret: Secret) -> Self {
        Self { secret }
    }

    /// AES-128-ECB over a single block, in place.
    pub fn encrypt_block_in_place(&self, block: &mut DataBlock) {
        self.cipher().encrypt_block(Block::from_mut_slice(block));
    }

    /// AES-128-ECB over consecutive blocks, each encrypted independently.
    pub fn encrypt_ecb_in_place(&self, data: &mut [u8]) -> Result<(), CryptoError> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::PartialBlock(data.len()));
        }
        let cipher = self.cipher();
        for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
            cipher.encrypt_block(Block::from_mut_slice(chunk));
        }
        Ok(())
    }

    // Key schedule is rebuilt per call, straight from the secret.
    fn cipher(&self) -> Aes128 {
        Aes128::new(GenericArray::from_slice(&self.secret.0))
    }
}
