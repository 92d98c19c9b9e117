use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::{entity::users::Entity as Users, error::AppResult, models::Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRef {
    pub id: Uuid,
    pub role: Role,
}

pub async fn resolve_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Option<UserRef>> {
    let Some(user) = Users::find_by_id(user_id).one(conn).await? else {
        return Ok(None);
    };
    Ok(Some(UserRef {
        id: user.id,
        role: user.role.parse()?,
    }))
}
