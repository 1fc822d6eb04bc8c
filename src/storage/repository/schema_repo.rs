use crate::report::EntityLookup;
use crate::schema::{
    Entity, EntityRelationship, EntityView, Property, PropertyFlags, PropertyOption, PropertyType,
};
use crate::storage::entity::entity_def::{
    self, ActiveModel as EntityDefActiveModel, Entity as EntityDef,
};
use crate::storage::entity::entity_relationship::{
    self, ActiveModel as RelationshipActiveModel, Entity as RelationshipRecord,
};
use crate::storage::entity::entity_view::{
    self, ActiveModel as ViewActiveModel, Entity as ViewRecord,
};
use crate::storage::entity::property::{
    self, ActiveModel as PropertyActiveModel, Entity as PropertyRecord,
};
use crate::storage::entity::property_option::{
    self, ActiveModel as OptionActiveModel, Entity as OptionRecord,
};
use chrono::Utc;
use log::{info, warn};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::{BTreeMap, HashMap};

pub struct SchemaRepository;

impl SchemaRepository {
    /// 创建实体及其属性、选项和视图（一个事务）。
    /// 草稿中的 id 会被忽略；视图列按草稿属性 id 映射到新 id
    pub async fn create_entity(db: &DatabaseConnection, draft: &Entity) -> Result<Entity, DbErr> {
        let txn = db.begin().await?;

        let record = EntityDefActiveModel {
            tenant_id: Set(draft.tenant_id),
            name: Set(draft.name.clone()),
            slug: Set(draft.slug.clone()),
            title: Set(draft.title.clone()),
            title_plural: Set(draft.title_plural.clone()),
            icon: Set(draft.icon.clone()),
            created_at: Set(Utc::now().timestamp()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut id_map: HashMap<i32, i32> = HashMap::new();
        for p in &draft.properties {
            let saved = insert_property(&txn, record.id, p).await?;
            id_map.insert(p.id, saved.id);
        }
        for v in &draft.views {
            let columns: Vec<i32> = v
                .columns
                .iter()
                .filter_map(|c| id_map.get(c).copied())
                .collect();
            let view = EntityView {
                entity_id: record.id,
                columns,
                ..v.clone()
            };
            insert_view(&txn, &view).await?;
        }

        txn.commit().await?;
        info!(
            "✓ 实体已创建: {} (id: {}, 属性: {})",
            record.name,
            record.id,
            draft.properties.len()
        );

        Self::load_entity(db, EntityLookup::Id(record.id))
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("entity {}", record.id)))
    }

    pub async fn add_property(
        db: &DatabaseConnection,
        entity_id: i32,
        draft: &Property,
    ) -> Result<Property, DbErr> {
        let txn = db.begin().await?;
        let saved = insert_property(&txn, entity_id, draft).await?;
        txn.commit().await?;
        Ok(saved)
    }

    pub async fn add_relationship(
        db: &DatabaseConnection,
        draft: &EntityRelationship,
    ) -> Result<EntityRelationship, DbErr> {
        let m = RelationshipActiveModel {
            parent_id: Set(draft.parent_id),
            child_id: Set(draft.child_id),
            title: Set(draft.title.clone()),
            sort_order: Set(draft.order),
            is_distinct: Set(draft.distinct),
            read_only: Set(draft.read_only),
            hidden_if_empty: Set(draft.hidden_if_empty),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(relationship_from_model(m))
    }

    pub async fn add_view(db: &DatabaseConnection, draft: &EntityView) -> Result<EntityView, DbErr> {
        insert_view(db, draft).await
    }

    pub async fn load_entity(
        db: &DatabaseConnection,
        lookup: EntityLookup<'_>,
    ) -> Result<Option<Entity>, DbErr> {
        let found = match lookup {
            EntityLookup::Id(id) => EntityDef::find_by_id(id).one(db).await?,
            EntityLookup::Slug(slug) => {
                EntityDef::find()
                    .filter(entity_def::Column::Slug.eq(slug))
                    .order_by_asc(entity_def::Column::Id)
                    .one(db)
                    .await?
            }
        };
        match found {
            Some(m) => Ok(Some(assemble(db, m).await?)),
            None => Ok(None),
        }
    }

    pub async fn list_entities(
        db: &DatabaseConnection,
        tenant_id: Option<i32>,
    ) -> Result<Vec<Entity>, DbErr> {
        let mut query = EntityDef::find();
        if let Some(t) = tenant_id {
            query = query.filter(entity_def::Column::TenantId.eq(t));
        }
        let models = query.order_by_asc(entity_def::Column::Id).all(db).await?;

        let mut out = Vec::with_capacity(models.len());
        for m in models {
            out.push(assemble(db, m).await?);
        }
        Ok(out)
    }

    /// 按 id 查属性（可跨实体），带选项
    pub async fn find_properties(
        db: &DatabaseConnection,
        ids: &[i32],
    ) -> Result<Vec<Property>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = PropertyRecord::find()
            .filter(property::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(property::Column::Id)
            .all(db)
            .await?;
        with_options(db, models).await
    }
}

async fn insert_property<C: ConnectionTrait>(
    db: &C,
    entity_id: i32,
    draft: &Property,
) -> Result<Property, DbErr> {
    let attributes_json =
        serde_json::to_string(&draft.attributes).unwrap_or_else(|_| "{}".to_string());
    let m = PropertyActiveModel {
        entity_id: Set(entity_id),
        name: Set(draft.name.clone()),
        title: Set(draft.title.clone()),
        property_type: Set(draft.property_type.code()),
        subtype: Set(draft.subtype.map(|s| s.as_str().to_string())),
        sort_order: Set(draft.order),
        is_required: Set(draft.flags.required),
        is_read_only: Set(draft.flags.read_only),
        is_hidden: Set(draft.flags.hidden),
        show_in_create: Set(draft.flags.show_in_create),
        can_update: Set(draft.flags.can_update),
        attributes_json: Set(attributes_json),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let option_models: Vec<OptionActiveModel> = draft
        .options
        .iter()
        .map(|o| OptionActiveModel {
            property_id: Set(m.id),
            name: Set(o.name.clone()),
            value: Set(o.value.clone()),
            color: Set(o.color.clone()),
            sort_order: Set(o.order),
            ..Default::default()
        })
        .collect();
    if !option_models.is_empty() {
        OptionRecord::insert_many(option_models).exec(db).await?;
    }

    let options = OptionRecord::find()
        .filter(property_option::Column::PropertyId.eq(m.id))
        .order_by_asc(property_option::Column::SortOrder)
        .order_by_asc(property_option::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(option_from_model)
        .collect();
    Ok(property_from_model(m, options))
}

async fn insert_view<C: ConnectionTrait>(db: &C, draft: &EntityView) -> Result<EntityView, DbErr> {
    let columns_json = serde_json::to_string(&draft.columns).unwrap_or_else(|_| "[]".to_string());
    let m = ViewActiveModel {
        entity_id: Set(draft.entity_id),
        name: Set(draft.name.clone()),
        title: Set(draft.title.clone()),
        sort_order: Set(draft.order),
        columns_json: Set(columns_json),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(view_from_model(m))
}

async fn assemble(db: &DatabaseConnection, m: entity_def::Model) -> Result<Entity, DbErr> {
    let property_models = PropertyRecord::find()
        .filter(property::Column::EntityId.eq(m.id))
        .order_by_asc(property::Column::SortOrder)
        .order_by_asc(property::Column::Id)
        .all(db)
        .await?;
    let properties = with_options(db, property_models).await?;

    let parents = RelationshipRecord::find()
        .filter(entity_relationship::Column::ChildId.eq(m.id))
        .order_by_asc(entity_relationship::Column::SortOrder)
        .order_by_asc(entity_relationship::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(relationship_from_model)
        .collect();
    let children = RelationshipRecord::find()
        .filter(entity_relationship::Column::ParentId.eq(m.id))
        .order_by_asc(entity_relationship::Column::SortOrder)
        .order_by_asc(entity_relationship::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(relationship_from_model)
        .collect();
    let views = ViewRecord::find()
        .filter(entity_view::Column::EntityId.eq(m.id))
        .order_by_asc(entity_view::Column::SortOrder)
        .all(db)
        .await?
        .into_iter()
        .map(view_from_model)
        .collect();

    Ok(Entity {
        id: m.id,
        tenant_id: m.tenant_id,
        name: m.name,
        slug: m.slug,
        title: m.title,
        title_plural: m.title_plural,
        icon: m.icon,
        properties,
        parents,
        children,
        views,
    })
}

async fn with_options(
    db: &DatabaseConnection,
    models: Vec<property::Model>,
) -> Result<Vec<Property>, DbErr> {
    let ids: Vec<i32> = models.iter().map(|m| m.id).collect();
    let mut options: BTreeMap<i32, Vec<PropertyOption>> = BTreeMap::new();
    if !ids.is_empty() {
        let rows = OptionRecord::find()
            .filter(property_option::Column::PropertyId.is_in(ids))
            .order_by_asc(property_option::Column::SortOrder)
            .order_by_asc(property_option::Column::Id)
            .all(db)
            .await?;
        for o in rows {
            options
                .entry(o.property_id)
                .or_default()
                .push(option_from_model(o));
        }
    }
    Ok(models
        .into_iter()
        .map(|m| {
            let opts = options.remove(&m.id).unwrap_or_default();
            property_from_model(m, opts)
        })
        .collect())
}

fn property_from_model(m: property::Model, options: Vec<PropertyOption>) -> Property {
    let property_type = PropertyType::from_code(m.property_type).unwrap_or_else(|| {
        warn!(
            "⚠ 属性 {} 的类型编码未知: {}，按 TEXT 处理",
            m.id, m.property_type
        );
        PropertyType::Text
    });
    Property {
        id: m.id,
        entity_id: m.entity_id,
        name: m.name,
        title: m.title,
        property_type,
        subtype: m.subtype.as_deref().and_then(|s| s.parse().ok()),
        order: m.sort_order,
        flags: PropertyFlags {
            required: m.is_required,
            read_only: m.is_read_only,
            hidden: m.is_hidden,
            show_in_create: m.show_in_create,
            can_update: m.can_update,
        },
        options,
        attributes: serde_json::from_str(&m.attributes_json).unwrap_or_default(),
    }
}

fn option_from_model(m: property_option::Model) -> PropertyOption {
    PropertyOption {
        id: m.id,
        property_id: m.property_id,
        name: m.name,
        value: m.value,
        color: m.color,
        order: m.sort_order,
    }
}

fn relationship_from_model(m: entity_relationship::Model) -> EntityRelationship {
    EntityRelationship {
        id: m.id,
        parent_id: m.parent_id,
        child_id: m.child_id,
        title: m.title,
        order: m.sort_order,
        distinct: m.is_distinct,
        read_only: m.read_only,
        hidden_if_empty: m.hidden_if_empty,
    }
}

fn view_from_model(m: entity_view::Model) -> EntityView {
    EntityView {
        id: m.id,
        entity_id: m.entity_id,
        name: m.name,
        title: m.title,
        order: m.sort_order,
        columns: serde_json::from_str(&m.columns_json).unwrap_or_default(),
    }
}
