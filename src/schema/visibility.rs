use crate::schema::model::{Entity, Property};

/// 表单上下文：决定哪些属性可见
#[derive(Debug, Clone, Copy, Default)]
pub struct FormContext<'a> {
    pub is_create: bool,
    pub is_edit: bool,
    pub can_update: bool,
    pub hidden: &'a [String],
}

impl<'a> FormContext<'a> {
    pub fn create() -> Self {
        Self {
            is_create: true,
            can_update: true,
            ..Default::default()
        }
    }

    pub fn edit(can_update: bool) -> Self {
        Self {
            is_edit: true,
            can_update,
            ..Default::default()
        }
    }

    pub fn read() -> Self {
        Self::default()
    }

    pub fn with_hidden(mut self, hidden: &'a [String]) -> Self {
        self.hidden = hidden;
        self
    }
}

pub fn is_visible(property: &Property, ctx: &FormContext<'_>) -> bool {
    let flags = &property.flags;
    if flags.hidden {
        return false;
    }
    if ctx.hidden.iter().any(|name| name == &property.name) {
        return false;
    }
    if ctx.is_create && (flags.read_only || !flags.show_in_create) {
        return false;
    }
    if ctx.is_edit && !(ctx.can_update && flags.can_update) {
        return false;
    }
    true
}

/// 按属性声明顺序返回可见属性；未知属性自然被排除
pub fn visible_properties<'e>(entity: &'e Entity, ctx: &FormContext<'_>) -> Vec<&'e Property> {
    let mut props: Vec<&Property> = entity
        .properties
        .iter()
        .filter(|p| is_visible(p, ctx))
        .collect();
    props.sort_by_key(|p| p.order);
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::job_entity;

    fn names(props: Vec<&Property>) -> Vec<&str> {
        props.into_iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_hidden_flag_always_excludes() {
        let mut entity = job_entity();
        entity.properties[0].flags.hidden = true;
        let visible = names(visible_properties(&entity, &FormContext::read()));
        assert!(!visible.contains(&"title"));
        assert!(visible.contains(&"status"));
    }

    #[test]
    fn test_create_context_drops_read_only_and_not_in_create() {
        let mut entity = job_entity();
        entity.properties[1].flags.read_only = true;
        entity.properties[2].flags.show_in_create = false;
        let create = names(visible_properties(&entity, &FormContext::create()));
        assert_eq!(create, vec!["title", "bonus", "opened"]);

        // 只读属性在查看时仍可见
        let read = names(visible_properties(&entity, &FormContext::read()));
        assert_eq!(read.len(), entity.properties.len());
    }

    #[test]
    fn test_edit_context_requires_update_rights() {
        let mut entity = job_entity();
        entity.properties[3].flags.can_update = false;
        let editable = names(visible_properties(&entity, &FormContext::edit(true)));
        assert!(!editable.contains(&"bonus"));
        assert_eq!(editable.len(), entity.properties.len() - 1);

        let none = visible_properties(&entity, &FormContext::edit(false));
        assert!(none.is_empty());
    }

    #[test]
    fn test_caller_hidden_list() {
        let entity = job_entity();
        let hidden = vec!["salary".to_string(), "unknown".to_string()];
        let ctx = FormContext::read().with_hidden(&hidden);
        let visible = names(visible_properties(&entity, &ctx));
        assert!(!visible.contains(&"salary"));
        assert_eq!(visible.len(), entity.properties.len() - 1);
    }
}
