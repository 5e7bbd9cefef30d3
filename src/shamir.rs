//! Shamir secret splitting/recovery over GF(2^8) (spec.md §4.2).
//!
//! `ShamirSecret` stores exactly `threshold` basis points. Once established
//! — whether by [`ShamirSecret::split`] or [`ShamirSecret::recover_secretdata`]
//! — the same generalized Lagrange interpolation serves both `secretdata`
//! (evaluate at `x = 0`) and `compute_share` (evaluate at any other `x`),
//! because `threshold` points on a degree-`(threshold - 1)` polynomial pin
//! down that polynomial exactly.

use rand::RngCore;

use crate::digest::ct_eq;
use crate::error::{Error, Result};
use crate::gf256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub index: u8,
    pub y: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ShamirSecret {
    threshold: u8,
    basis: Vec<(u8, Vec<u8>)>,
}

impl ShamirSecret {
    /// Split `secret` into a fresh `ShamirSecret`, generating `threshold - 1`
    /// random coefficients per byte position and recording `threshold`
    /// synthetic points (`x = 1..=threshold`) as the interpolation basis.
    ///
    /// This constructor is not on the engine's runtime hot path (the engine
    /// only ever learns `shamir` via [`ShamirSecret::recover_secretdata`],
    /// per spec.md §3's invariant that `shamir` is absent while locked); it
    /// exists for test fixtures and out-of-band bootstrap tooling.
    pub fn split(threshold: u8, secret: &[u8], rng: &mut impl RngCore) -> Result<Self> {
        if threshold < 2 {
            return Err(Error::Config(format!("threshold {threshold} must be >= 2")));
        }

        let mut coeffs_per_byte: Vec<Vec<u8>> = Vec::with_capacity(secret.len());
        for &byte in secret {
            let mut coeffs = vec![0u8; threshold as usize];
            coeffs[0] = byte;
            rng.fill_bytes(&mut coeffs[1..]);
            coeffs_per_byte.push(coeffs);
        }

        let mut basis = Vec::with_capacity(threshold as usize);
        for x in 1..=threshold {
            let y: Vec<u8> = coeffs_per_byte
                .iter()
                .map(|coeffs| gf256::eval_poly(coeffs, x))
                .collect();
            basis.push((x, y));
        }
        Ok(Self { threshold, basis })
    }

    /// Recover from `>= threshold` distinct `(x, y)` shares. The first
    /// `threshold` shares become the interpolation basis; any further shares
    /// are an audit: each must agree with the fitted polynomial, or recovery
    /// fails with [`Error::RecoverMismatch`].
    pub fn recover_secretdata(threshold: u8, shares: &[(u8, Vec<u8>)]) -> Result<Self> {
        if shares.len() < threshold as usize {
            return Err(Error::InsufficientShares {
                needed: threshold,
                got: shares.len(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for (x, _) in shares {
            if !seen.insert(*x) {
                return Err(Error::DuplicateShare(*x));
            }
        }

        let basis = shares[..threshold as usize].to_vec();
        let candidate = Self { threshold, basis };

        let mut checked = 0usize;
        for (x, y) in &shares[threshold as usize..] {
            checked += 1;
            let recomputed = candidate.interpolate(*x);
            if !ct_eq(&recomputed, y) {
                return Err(Error::RecoverMismatch { checked });
            }
        }

        Ok(candidate)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Rebuild a `ShamirSecret` from a previously-established basis (e.g.
    /// one persisted by [`crate::state::EngineState`]). Does not re-run the
    /// consistency audit: the basis is trusted to have already passed it.
    pub fn from_basis(threshold: u8, basis: Vec<(u8, Vec<u8>)>) -> Self {
        Self { threshold, basis }
    }

    pub fn basis(&self) -> &[(u8, Vec<u8>)] {
        &self.basis
    }

    /// The master secret: interpolate the basis at `x = 0`.
    pub fn secretdata(&self) -> Vec<u8> {
        self.interpolate(0)
    }

    /// A share for share number `n` (`n != 0`): interpolate the basis at `x = n`.
    pub fn compute_share(&self, n: u8) -> Share {
        Share {
            index: n,
            y: self.interpolate(n),
        }
    }

    fn interpolate(&self, x: u8) -> Vec<u8> {
        let len = self.basis[0].1.len();
        let mut result = vec![0u8; len];
        for (i, (xi, yi)) in self.basis.iter().enumerate() {
            let mut coefficient = 1u8;
            for (j, (xj, _)) in self.basis.iter().enumerate() {
                if i == j {
                    continue;
                }
                let numerator = gf256::add(*xj, x);
                let denominator = gf256::add(*xj, *xi);
                coefficient = gf256::mul(coefficient, gf256::div(numerator, denominator));
            }
            for (k, slot) in result.iter_mut().enumerate() {
                *slot = gf256::add(*slot, gf256::mul(coefficient, yi[k]));
            }
        }
        result
    }
}
