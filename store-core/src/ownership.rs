//! Order ownership resolution
//!
//! Orders arrive from several backend generations and carry their
//! owner under different field names. Matching normalizes both sides
//! (trim + lowercase) and checks every alias. Orders with no owner
//! information at all are "orphans"; whether a signed-in customer can
//! see them is a policy choice.

use shared::order::Order;

/// How orphan orders (no owner alias populated) are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerPolicy {
    /// Orphans are shown to any signed-in customer. Matches legacy
    /// data where old orders predate owner stamping.
    #[default]
    LenientOrphans,
    /// Orphans are hidden from customers.
    Strict,
}

/// Whether `actor_email` owns `order` under `policy`.
///
/// Guests (empty or literal "guest" emails) own nothing, orphans
/// included.
pub fn is_owner(order: &Order, actor_email: &str, policy: OwnerPolicy) -> bool {
    let actor = actor_email.trim().to_lowercase();
    if actor.is_empty() || actor == "guest" {
        return false;
    }

    let aliases = order.owner_aliases();
    if aliases.is_empty() {
        return policy == OwnerPolicy::LenientOrphans;
    }
    aliases
        .iter()
        .any(|alias| alias.trim().to_lowercase() == actor)
}

/// Filter a listing down to what `actor_email` may see. Admins see
/// everything.
pub fn visible_to(
    orders: &[Order],
    actor_email: &str,
    is_admin: bool,
    policy: OwnerPolicy,
) -> Vec<Order> {
    if is_admin {
        return orders.to_vec();
    }
    orders
        .iter()
        .filter(|o| is_owner(o, actor_email, policy))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{AccountRef, OwnerRef};

    fn with_email(email: &str) -> Order {
        Order {
            id: "1".to_string(),
            user_email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_match_is_case_and_whitespace_insensitive() {
        let order = with_email("  Tyson@Example.COM ");
        assert!(is_owner(&order, "tyson@example.com", OwnerPolicy::Strict));
        assert!(is_owner(&order, " TYSON@example.com  ", OwnerPolicy::Strict));
        assert!(!is_owner(&order, "kai@example.com", OwnerPolicy::Strict));
    }

    #[test]
    fn test_every_alias_is_checked() {
        let by_customer = Order {
            id: "1".to_string(),
            customer_email: Some("a@x.com".to_string()),
            ..Default::default()
        };
        assert!(is_owner(&by_customer, "a@x.com", OwnerPolicy::Strict));

        let by_user_object = Order {
            id: "2".to_string(),
            user: Some(OwnerRef::Account(AccountRef {
                email: Some("b@x.com".to_string()),
            })),
            ..Default::default()
        };
        assert!(is_owner(&by_user_object, "b@x.com", OwnerPolicy::Strict));

        let by_user_string = Order {
            id: "3".to_string(),
            user: Some(OwnerRef::Email("c@x.com".to_string())),
            ..Default::default()
        };
        assert!(is_owner(&by_user_string, "c@x.com", OwnerPolicy::Strict));
    }

    #[test]
    fn test_guests_own_nothing() {
        let orphan = Order {
            id: "1".to_string(),
            ..Default::default()
        };
        assert!(!is_owner(&orphan, "", OwnerPolicy::LenientOrphans));
        assert!(!is_owner(&orphan, "guest", OwnerPolicy::LenientOrphans));
        assert!(!is_owner(&with_email("guest"), "Guest", OwnerPolicy::LenientOrphans));
    }

    #[test]
    fn test_orphans_follow_policy() {
        let orphan = Order {
            id: "1".to_string(),
            ..Default::default()
        };
        assert!(is_owner(&orphan, "a@x.com", OwnerPolicy::LenientOrphans));
        assert!(!is_owner(&orphan, "a@x.com", OwnerPolicy::Strict));
    }

    #[test]
    fn test_visible_to_admin_sees_all() {
        let orders = vec![with_email("a@x.com"), with_email("b@x.com")];
        let all = visible_to(&orders, "admin@x.com", true, OwnerPolicy::Strict);
        assert_eq!(all.len(), 2);

        let mine = visible_to(&orders, "a@x.com", false, OwnerPolicy::Strict);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_visible_to_keeps_orphans_when_lenient() {
        let orphan = Order {
            id: "legacy".to_string(),
            ..Default::default()
        };
        let orders = vec![with_email("a@x.com"), with_email("b@x.com"), orphan];

        let lenient = visible_to(&orders, "a@x.com", false, OwnerPolicy::LenientOrphans);
        let ids: Vec<&str> = lenient.iter().map(|o| o.id.as_str()).collect();
        assert!(ids.contains(&"legacy"));
        assert_eq!(lenient.len(), 2);

        let strict = visible_to(&orders, "a@x.com", false, OwnerPolicy::Strict);
        assert_eq!(strict.len(), 1);
    }
}
