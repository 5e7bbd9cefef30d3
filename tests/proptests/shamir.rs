//! Split/recover round-trip property (spec.md §8 invariant 7).

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use rand::SeedableRng;
use rand::rngs::StdRng;

use pph::shamir::ShamirSecret;

#[quickcheck]
fn any_threshold_shares_recover_the_secret(secret: Vec<u8>, threshold_seed: u8, seed: u64) -> TestResult {
    if secret.is_empty() || secret.len() > 64 {
        return TestResult::discard();
    }
    let threshold = 2 + (threshold_seed % 8); // keep in [2, 9] for test speed
    let total = threshold + 3;

    let mut rng = StdRng::seed_from_u64(seed);
    let shamir = ShamirSecret::split(threshold, &secret, &mut rng).unwrap();

    let shares: Vec<(u8, Vec<u8>)> = (1..=total)
        .map(|n| {
            let s = shamir.compute_share(n);
            (s.index, s.y)
        })
        .collect();

    let recovered = ShamirSecret::recover_secretdata(threshold, &shares[..threshold as usize]).unwrap();
    TestResult::from_bool(recovered.secretdata() == secret)
}

#[quickcheck]
fn fewer_than_threshold_shares_are_rejected(secret: Vec<u8>, threshold_seed: u8, seed: u64) -> TestResult {
    if secret.is_empty() || secret.len() > 32 {
        return TestResult::discard();
    }
    let threshold = 3 + (threshold_seed % 6); // keep in [3, 8]

    let mut rng = StdRng::seed_from_u64(seed);
    let shamir = ShamirSecret::split(threshold, &secret, &mut rng).unwrap();

    let shares: Vec<(u8, Vec<u8>)> = (1..threshold)
        .map(|n| {
            let s = shamir.compute_share(n);
            (s.index, s.y)
        })
        .collect();

    TestResult::from_bool(ShamirSecret::recover_secretdata(threshold, &shares).is_err())
}
