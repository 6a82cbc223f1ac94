use std::collections::{HashMap, HashSet};

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::user::OrgUser;

/// One node of the reporting forest: a user plus direct subordinates.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub user: OrgUser,
    pub children: Vec<TreeNode>,
}

/// Build the reporting forest from flat `manager_id` parent pointers.
///
/// A user whose manager is unknown (or who manages themselves, which
/// `set_manager` forbids but old data may contain) becomes a root.
pub fn build_tree(users: Vec<OrgUser>) -> Vec<TreeNode> {
    let known: HashSet<u64> = users.iter().map(|u| u.id).collect();

    let mut children: HashMap<u64, Vec<OrgUser>> = HashMap::new();
    let mut roots = Vec::new();
    for user in users {
        match user.manager_id {
            Some(m) if m != user.id && known.contains(&m) => {
                children.entry(m).or_default().push(user)
            }
            _ => roots.push(user),
        }
    }

    fn attach(user: OrgUser, children: &mut HashMap<u64, Vec<OrgUser>>) -> TreeNode {
        let direct = children.remove(&user.id).unwrap_or_default();
        TreeNode {
            user,
            children: direct.into_iter().map(|c| attach(c, children)).collect(),
        }
    }

    roots.into_iter().map(|r| attach(r, &mut children)).collect()
}

/// Validate a manager reassignment against the current parent pointers.
///
/// Rejects self-management and walks up the proposed manager's chain so the
/// hierarchy stays a forest (no A manages B manages A).
pub fn validate_manager_change(
    parents: &HashMap<u64, Option<u64>>,
    user_id: u64,
    new_manager_id: u64,
) -> AppResult<()> {
    if user_id == new_manager_id {
        return Err(AppError::invalid_input("a user cannot manage themselves"));
    }
    if !parents.contains_key(&new_manager_id) {
        return Err(AppError::NotFound("manager"));
    }

    let mut current = Some(new_manager_id);
    let mut seen = HashSet::new();
    while let Some(id) = current {
        if id == user_id {
            return Err(AppError::invalid_input(
                "assignment would create a reporting cycle",
            ));
        }
        // stale data may already hold a cycle; stop instead of spinning
        if !seen.insert(id) {
            break;
        }
        current = parents.get(&id).copied().flatten();
    }
    Ok(())
}

/// True when `user` falls inside `manager`'s team scope: a direct report,
/// or a member of the same department.
pub fn in_team_scope(manager: &OrgUser, user: &OrgUser) -> bool {
    user.manager_id == Some(manager.id)
        || (manager.department_id.is_some() && user.department_id == manager.department_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, manager_id: Option<u64>, department_id: Option<u64>) -> OrgUser {
        OrgUser {
            id,
            email: format!("u{id}@test"),
            first_name: format!("U{id}"),
            last_name: "Test".into(),
            role_id: 4,
            department_id,
            manager_id,
        }
    }

    #[test]
    fn builds_forest_with_unknown_managers_as_roots() {
        let users = vec![
            user(1, None, None),
            user(2, Some(1), None),
            user(3, Some(1), None),
            user(4, Some(2), None),
            user(5, Some(99), None), // unknown manager -> root
        ];
        let forest = build_tree(users);
        assert_eq!(forest.len(), 2);

        let root1 = forest.iter().find(|n| n.user.id == 1).unwrap();
        assert_eq!(root1.children.len(), 2);
        let node2 = root1.children.iter().find(|n| n.user.id == 2).unwrap();
        assert_eq!(node2.children.len(), 1);
        assert_eq!(node2.children[0].user.id, 4);

        assert!(forest.iter().any(|n| n.user.id == 5));
    }

    #[test]
    fn self_managed_user_becomes_root() {
        let forest = build_tree(vec![user(1, Some(1), None)]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn rejects_self_management() {
        let parents = HashMap::from([(1, None)]);
        assert!(matches!(
            validate_manager_change(&parents, 1, 1),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_two_step_cycle() {
        // 2 reports to 1; making 1 report to 2 would close the loop
        let parents = HashMap::from([(1, None), (2, Some(1))]);
        assert!(matches!(
            validate_manager_change(&parents, 1, 2),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_deep_cycle() {
        // 4 -> 3 -> 2 -> 1; reassigning 1 under 4 walks the whole chain
        let parents = HashMap::from([(1, None), (2, Some(1)), (3, Some(2)), (4, Some(3))]);
        assert!(validate_manager_change(&parents, 1, 4).is_err());
        // sideways moves stay legal
        assert!(validate_manager_change(&parents, 4, 2).is_ok());
    }

    #[test]
    fn unknown_manager_is_not_found() {
        let parents = HashMap::from([(1, None)]);
        assert!(matches!(
            validate_manager_change(&parents, 1, 77),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn team_scope_covers_reports_and_department() {
        let mgr = user(7, None, Some(10));
        assert!(in_team_scope(&mgr, &user(8, Some(7), None)));
        assert!(in_team_scope(&mgr, &user(9, None, Some(10))));
        assert!(!in_team_scope(&mgr, &user(10, Some(3), Some(11))));
    }

    #[test]
    fn managers_without_department_only_see_direct_reports() {
        let mgr = user(7, None, None);
        assert!(in_team_scope(&mgr, &user(8, Some(7), None)));
        assert!(!in_team_scope(&mgr, &user(9, None, None)));
    }
}
