//! Redirection split policy.
//!
//! The reserve is divided evenly across backups in registration order. The
//! `total mod n` leftover units go one each to the first backups, so the
//! shares always sum to exactly `total`.

use citadel_types::PrincipalId;

pub fn split_evenly(total: u128, recipients: &[PrincipalId]) -> Vec<(PrincipalId, u128)> {
    if recipients.is_empty() {
        return Vec::new();
    }
    let n = recipients.len() as u128;
    let share = total / n;
    let remainder = total % n;
    recipients
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let bonus = u128::from((i as u128) < remainder);
            (p.clone(), share + bonus)
        })
        .collect()
}
