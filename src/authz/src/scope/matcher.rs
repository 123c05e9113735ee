/// Scope matching
///
/// AND across required keys, OR within the values of one key.

use super::types::ScopeExpression;

/// Whether `requested` satisfies `required`
///
/// An empty `required` is always satisfied. Otherwise every required key must
/// be present in `requested` and share at least one value with it.
pub fn is_authorized(requested: &ScopeExpression, required: &ScopeExpression) -> bool {
    required.iter().all(|(key, allowed)| {
        requested
            .values(key)
            .is_some_and(|granted| !granted.is_disjoint(allowed))
    })
}

/// Keep the candidates whose required scope `requested` satisfies
///
/// Unauthorized candidates are dropped silently.
pub fn filter_authorized<'a, T, I>(requested: &ScopeExpression, candidates: I) -> Vec<T>
where
    I: IntoIterator<Item = (T, &'a ScopeExpression)>,
{
    candidates
        .into_iter()
        .filter(|(_, required)| is_authorized(requested, required))
        .map(|(candidate, _)| candidate)
        .collect()
}
