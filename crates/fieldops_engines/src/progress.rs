#![forbid(unsafe_code)]

use fieldops_contracts::task::Task;

/// Checklist completion percentage, recomputed on every read so it can never
/// drift from the underlying items. An empty checklist is 0% complete, not
/// 100%.
pub fn progress(task: &Task) -> u8 {
    let total = task.items.len() as u64;
    if total == 0 {
        return 0;
    }
    let completed = task.items.iter().filter(|item| item.done).count() as u64;
    // Round-half-up integer percentage.
    ((100 * completed + total / 2) / total) as u8
}
