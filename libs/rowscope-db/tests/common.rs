#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use rowscope_db::secure::{OrganizationId, SecureConn, TenantId, UnscopedPolicy};
use rowscope_db::{SecureDbConfig, connect};
use sea_orm::{ConnectionTrait, Set};
use uuid::Uuid;

pub mod gym_class {
    use rowscope_db::secure::Scopable;
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel, Scopable)]
    #[sea_orm(table_name = "gym_classes")]
    #[secure(tenant_col = "tenant_id", no_organization, resource_col = "id")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod member {
    use rowscope_db::secure::Scopable;
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel, Scopable)]
    #[sea_orm(table_name = "members")]
    #[secure(
        tenant_col = "tenant_id",
        organization_col = "organization_id",
        resource_col = "id"
    )]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        pub organization_id: Uuid,
        pub email: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Timetable slot of a class. Slots carry no tenant of their own; they are
/// visible through the class they belong to.
pub mod slot {
    use rowscope_db::secure::Scopable;
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel, Scopable)]
    #[sea_orm(table_name = "slots")]
    #[secure(unrestricted)]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub class_id: Uuid,
        pub starts_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::gym_class::Entity",
            from = "Column::ClassId",
            to = "super::gym_class::Column::Id"
        )]
        GymClass,
    }

    impl Related<super::gym_class::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::GymClass.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod plan {
    use rowscope_db::secure::Scopable;
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel, Scopable)]
    #[sea_orm(table_name = "plans")]
    #[secure(unrestricted)]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

const SCHEMA: [&str; 4] = [
    "CREATE TABLE gym_classes (id TEXT PRIMARY KEY NOT NULL, tenant_id TEXT NOT NULL, name TEXT NOT NULL)",
    "CREATE TABLE members (id TEXT PRIMARY KEY NOT NULL, tenant_id TEXT NOT NULL, organization_id TEXT NOT NULL, email TEXT NOT NULL)",
    "CREATE TABLE plans (id TEXT PRIMARY KEY NOT NULL, name TEXT NOT NULL)",
    "CREATE TABLE slots (id TEXT PRIMARY KEY NOT NULL, class_id TEXT NOT NULL, starts_at TEXT NOT NULL)",
];

pub async fn create_schema(db: &SecureConn) {
    for ddl in SCHEMA {
        db.conn().execute_unprepared(ddl).await.unwrap();
    }
}

/// Single-connection in-memory database with the schema applied.
pub async fn memory_db(policy: UnscopedPolicy) -> SecureConn {
    let cfg = SecureDbConfig {
        max_conns: 1,
        unscoped_policy: policy,
        ..SecureDbConfig::new("sqlite::memory:")
    };
    let db = connect(&cfg).await.unwrap();
    create_schema(&db).await;
    db
}

pub fn tenant(id: Uuid) -> TenantId {
    TenantId::new(id).unwrap()
}

pub fn organization(id: Uuid) -> OrganizationId {
    OrganizationId::new(id).unwrap()
}

/// Insert a class for `tenant_id` through a unit bound to that tenant.
pub async fn seed_class(db: &SecureConn, tenant_id: Uuid, name: &str) -> gym_class::Model {
    let mut uow = db.unit_of_work();
    uow.enable_tenant(tenant(tenant_id));
    uow.insert::<gym_class::Entity>(gym_class::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_owned()),
        ..Default::default()
    })
    .await
    .unwrap()
}

pub async fn class_names(uow: &rowscope_db::secure::UnitOfWork<'_>) -> Vec<String> {
    let mut names: Vec<String> = uow
        .find::<gym_class::Entity>()
        .unwrap()
        .all(uow)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    names.sort();
    names
}
