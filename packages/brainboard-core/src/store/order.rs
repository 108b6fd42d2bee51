/// Read-time reconciliation of a recorded card order against a column's
/// actual membership. Pure: stale entries are filtered here on every read
/// instead of being eagerly cleaned out of the persisted lists.

/// Display order for a column: recorded keys that are still members, in
/// recorded order, followed by members the recording never saw, in their
/// natural scan order. `recorded = None` means no explicit order exists
/// and the scan order is returned unchanged.
pub fn ordered(recorded: Option<&[String]>, members: &[String]) -> Vec<String> {
    let Some(recorded) = recorded else {
        return members.to_vec();
    };

    let mut remaining: Vec<&String> = members.iter().collect();
    let mut out = Vec::with_capacity(members.len());
    for key in recorded {
        if let Some(pos) = remaining.iter().position(|m| *m == key) {
            out.push(remaining.remove(pos).clone());
        }
    }
    out.extend(remaining.into_iter().cloned());
    out
}
