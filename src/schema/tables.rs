//! Table definitions for the scam-report platform.
//!
//! Each function returns one table; [`registry`] composes all of them.

use super::{Column, FkAction, Registry, RegistryError, Table};

/// Roles allowed in `review_comment.writer_role`.
pub const WRITER_ROLES: [&str; 2] = ["user", "admin"];

pub fn users() -> Table {
    Table::new("users")
        .column(Column::serial("user_id"))
        .column(Column::varchar("username", 50))
        .column(Column::varchar("email", 100))
        .column(Column::varchar("name", 50))
        .column(Column::integer("profile_picture_id").nullable())
        .column(Column::text("password"))
        .column(Column::boolean("is_verified").nullable().default("false"))
        .primary_key(&["user_id"])
        .unique("username")
        .unique("email")
}

pub fn admins() -> Table {
    Table::new("admins")
        .column(Column::serial("admin_id"))
        .column(Column::varchar("username", 50))
        .column(Column::varchar("email", 100))
        .column(Column::varchar("name", 50))
        .column(Column::varchar("contact_info", 255))
        .column(Column::varchar("bio", 255).nullable())
        .column(Column::integer("profile_picture_id").nullable())
        .column(Column::text("password"))
        .primary_key(&["admin_id"])
        .unique("username")
        .unique("email")
}

pub fn scam_type() -> Table {
    Table::new("scam_type")
        .column(Column::serial("scam_type_id"))
        .column(Column::varchar("scam_type", 50))
        .primary_key(&["scam_type_id"])
        .unique("scam_type")
}

pub fn report() -> Table {
    Table::new("report")
        .column(Column::serial("report_id"))
        .column(Column::varchar("title", 50))
        .column(Column::integer("writer_id"))
        .column(Column::integer("scam_type_id"))
        .column(Column::date("scam_date"))
        .column(Column::date("report_date"))
        .column(Column::numeric("financial_loss"))
        .column(Column::text("description"))
        .primary_key(&["report_id"])
        .foreign_key("writer_id", "users", "user_id")
        .foreign_key("scam_type_id", "scam_type", "scam_type_id")
}

pub fn review_content() -> Table {
    Table::new("review_content")
        .column(Column::serial("review_content_id"))
        .column(Column::text("review_content"))
        .primary_key(&["review_content_id"])
}

pub fn review() -> Table {
    Table::new("review")
        .column(Column::serial("review_id"))
        .column(Column::varchar("title", 50))
        .column(Column::integer("writer_id"))
        .column(Column::integer("scam_type_id"))
        .column(Column::date("review_date"))
        .column(Column::integer("review_content_id"))
        .column(Column::integer("views").default("0"))
        .primary_key(&["review_id"])
        .foreign_key("writer_id", "admins", "admin_id")
        .foreign_key("scam_type_id", "scam_type", "scam_type_id")
        .foreign_key("review_content_id", "review_content", "review_content_id")
}

/// `writer_id` has no foreign key: it points at `users` or `admins`
/// depending on `writer_role`.
pub fn review_comment() -> Table {
    Table::new("review_comment")
        .column(Column::serial("comment_id"))
        .column(Column::integer("root_id").nullable())
        .column(Column::integer("review_id"))
        .column(Column::integer("writer_id"))
        .column(Column::varchar("writer_role", 16))
        .column(Column::text("comment_content"))
        .column(Column::timestamp("created_at"))
        .primary_key(&["comment_id"])
        .foreign_key_on_delete("root_id", "review_comment", "comment_id", FkAction::Cascade)
        .foreign_key_on_delete("review_id", "review", "review_id", FkAction::Cascade)
        .check("review_comment_root_precedes", "root_id < comment_id")
        .check("review_comment_writer_role_known", &writer_role_check())
}

/// `writer_role IN (...)` over [`WRITER_ROLES`].
fn writer_role_check() -> String {
    let roles: Vec<String> = WRITER_ROLES.iter().map(|r| format!("'{}'", r)).collect();
    format!("writer_role IN ({})", roles.join(", "))
}

pub fn url_storage() -> Table {
    Table::new("url_storage")
        .column(Column::serial("url_id"))
        .column(Column::text("url"))
        .column(Column::varchar("description", 255).nullable())
        .column(Column::timestamp("search_date").nullable())
        .primary_key(&["url_id"])
}

pub fn url_comment() -> Table {
    Table::new("url_comment")
        .column(Column::serial("comment_id"))
        .column(Column::integer("url_id"))
        .column(Column::integer("writer_id"))
        .column(Column::integer("root_id").nullable())
        .column(Column::integer("rating"))
        .column(Column::text("comment_content"))
        .column(Column::timestamp("created_at"))
        .primary_key(&["comment_id"])
        .foreign_key_on_delete("url_id", "url_storage", "url_id", FkAction::Cascade)
        .foreign_key("writer_id", "users", "user_id")
        .foreign_key_on_delete("root_id", "url_comment", "comment_id", FkAction::Cascade)
        .check("url_comment_root_precedes", "root_id < comment_id")
}

pub fn tag() -> Table {
    Table::new("tag")
        .column(Column::serial("tag_id"))
        .column(Column::varchar("name", 50))
        .primary_key(&["tag_id"])
}

fn link(name: &str, left: (&str, &str, &str), right: (&str, Option<(&str, &str)>)) -> Table {
    let (left_col, left_table, left_ref) = left;
    let (right_col, right_ref) = right;
    let table = Table::new(name)
        .column(Column::integer(left_col))
        .column(Column::integer(right_col))
        .primary_key(&[left_col, right_col])
        .foreign_key_on_delete(left_col, left_table, left_ref, FkAction::Cascade);
    match right_ref {
        Some((ref_table, ref_col)) => {
            table.foreign_key_on_delete(right_col, ref_table, ref_col, FkAction::Cascade)
        }
        // Media live in a separate store; the id is opaque here.
        None => table,
    }
}

pub fn review_tag() -> Table {
    link(
        "review_tag",
        ("review_id", "review", "review_id"),
        ("tag_id", Some(("tag", "tag_id"))),
    )
}

pub fn report_media() -> Table {
    link(
        "report_media",
        ("report_id", "report", "report_id"),
        ("media_id", None),
    )
}

pub fn review_banner() -> Table {
    link(
        "review_banner",
        ("review_id", "review", "review_id"),
        ("media_id", None),
    )
}

pub fn review_content_media() -> Table {
    link(
        "review_content_media",
        ("review_content_id", "review_content", "review_content_id"),
        ("media_id", None),
    )
}

pub fn admin_review() -> Table {
    link(
        "admin_review",
        ("admin_id", "admins", "admin_id"),
        ("review_id", Some(("review", "review_id"))),
    )
}

pub fn user_report() -> Table {
    link(
        "user_report",
        ("user_id", "users", "user_id"),
        ("report_id", Some(("report", "report_id"))),
    )
}

pub fn conversation() -> Table {
    Table::new("conversation")
        .column(Column::serial("conversation_id"))
        .column(Column::integer("user_id").nullable())
        .column(Column::integer("admin_id").nullable())
        .column(Column::timestamp("created_at").nullable())
        .primary_key(&["conversation_id"])
        .foreign_key_on_delete("user_id", "users", "user_id", FkAction::SetNull)
        .foreign_key_on_delete("admin_id", "admins", "admin_id", FkAction::SetNull)
}

pub fn all() -> Vec<Table> {
    vec![
        users(),
        admins(),
        scam_type(),
        report(),
        review_content(),
        review(),
        review_comment(),
        url_storage(),
        url_comment(),
        tag(),
        review_tag(),
        report_media(),
        review_banner(),
        review_content_media(),
        admin_review(),
        user_report(),
        conversation(),
    ]
}

/// The full platform registry, validated.
pub fn registry() -> Result<Registry, RegistryError> {
    let registry = Registry::from_tables(all())?;
    registry.validate()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Constraint;

    #[test]
    fn test_registry_is_valid() {
        let registry = registry().expect("registry should validate");
        assert_eq!(registry.len(), 17);
    }

    #[test]
    fn test_lookup_tables_precede_their_users() {
        let registry = registry().unwrap();
        let order: Vec<&str> = registry
            .dependency_order()
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();

        assert!(pos("scam_type") < pos("report"));
        assert!(pos("users") < pos("report"));
        assert!(pos("review_content") < pos("review"));
        assert!(pos("admins") < pos("review"));
        assert!(pos("review") < pos("review_comment"));
        assert!(pos("url_storage") < pos("url_comment"));
        assert!(pos("tag") < pos("review_tag"));
    }

    #[test]
    fn test_writer_role_check_lists_every_role() {
        let table = review_comment();
        let expr = table
            .constraints
            .iter()
            .find_map(|c| match c {
                Constraint::Check { name, expr } if name == "review_comment_writer_role_known" => {
                    Some(expr.as_str())
                }
                _ => None,
            })
            .expect("writer role check missing");
        assert_eq!(expr, "writer_role IN ('user', 'admin')");
        for role in WRITER_ROLES {
            assert!(expr.contains(&format!("'{}'", role)));
        }
    }

    #[test]
    fn test_comment_tables_forbid_forward_roots() {
        for table in [review_comment(), url_comment()] {
            let has_check = table.constraints.iter().any(|c| {
                matches!(c, Constraint::Check { expr, .. } if expr == "root_id < comment_id")
            });
            assert!(has_check, "{} should order roots before replies", table.name);
        }
    }

    #[test]
    fn test_review_comment_writer_has_no_single_foreign_key() {
        let table = review_comment();
        assert!(table.foreign_keys().all(|fk| fk.column != "writer_id"));
        assert!(table.get_column("writer_role").is_some());
    }

    #[test]
    fn test_association_tables_use_composite_keys() {
        for table in [
            review_tag(),
            report_media(),
            review_banner(),
            review_content_media(),
            admin_review(),
            user_report(),
        ] {
            assert_eq!(table.primary_key.len(), 2, "{}", table.name);
        }
    }
}
