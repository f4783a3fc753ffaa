use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnFavorites,
    ManageOwnShoppingCart,
    ManageOwnRecipes,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let role = &session.role;

        ACTION_TABLE
            .iter()
            .find_map(|(r, actions)| {
                if role != r {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}
