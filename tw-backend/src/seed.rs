//! Demo data for the local backend.

use serde::Serialize;
use tracing::info;

use tw_core::constants::DEFAULT_SPACE_NAME;
use tw_core::error::TwResult;
use tw_models::{
    ChatMode, Contact, Database, InvitationMode, Notification, NotificationKind, RoomConfig,
    Space, Twincode, TwincodeKind,
};

/// Ids of the records created by `seed_demo_data`.
#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub space_id: String,
    pub contact_ids: Vec<String>,
    pub room_id: String,
    pub notification_ids: Vec<String>,
    /// Code to scan with `migration scan`.
    pub migration_twincode_id: String,
    /// Code to use with `subscription activate`.
    pub activation_twincode_id: String,
}

/// Populate the current space with contacts, a room, notifications and
/// the twincodes needed to exercise every workflow.
pub fn seed_demo_data(db: &Database) -> TwResult<SeedSummary> {
    let summary = db.transaction(|conn| {
        let space = match Space::find_current(conn)? {
            Some(space) => space,
            None => {
                let mut space = Space::new(DEFAULT_SPACE_NAME, None);
                space.is_current = true;
                space.save(conn)?;
                space
            }
        };

        let mut contact_ids = Vec::new();
        for (name, description) in [
            ("Ada Lovelace", Some("analytical engine")),
            ("Grace Hopper", None),
            ("Alan Turing", Some("Bletchley")),
        ] {
            let mut contact = Contact::new(&space.id, name);
            contact.description = description.map(str::to_string);
            let code = Twincode::new(TwincodeKind::Invitation, Some(name));
            code.save(conn)?;
            contact.peer_twincode_id = Some(code.id);
            contact.save(conn)?;
            contact_ids.push(contact.id);
        }

        let room = Contact::new_room(&space.id, "Book club");
        room.save(conn)?;
        RoomConfig {
            welcome_message: Some("Welcome to the book club".into()),
            chat_mode: ChatMode::Public,
            invitation_mode: InvitationMode::AdminOnly,
            ..RoomConfig::default_for(&room.id)
        }
        .save(conn)?;

        let mut notification_ids = Vec::new();
        for (contact_id, kind) in [
            (Some(&contact_ids[0]), NotificationKind::NewContact),
            (Some(&contact_ids[1]), NotificationKind::MissedCall),
            (Some(&contact_ids[2]), NotificationKind::Message),
            (None, NotificationKind::DeletedContact),
        ] {
            let notification = Notification::new(&space.id, contact_id.map(String::as_str), kind);
            notification.save(conn)?;
            notification_ids.push(notification.id);
        }

        let migration = Twincode::new(TwincodeKind::Migration, Some("Old phone"));
        migration.save(conn)?;
        let activation = Twincode::new(TwincodeKind::Activation, Some("Gift card"));
        activation.save(conn)?;

        Ok(SeedSummary {
            space_id: space.id,
            contact_ids,
            room_id: room.id,
            notification_ids,
            migration_twincode_id: migration.id,
            activation_twincode_id: activation.id,
        })
    })?;

    info!(
        "seeded {} contacts, 1 room and {} notifications into space {}",
        summary.contact_ids.len(),
        summary.notification_ids.len(),
        summary.space_id
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tw_core::config::DatabaseConfig;

    #[test]
    fn test_seed_populates_current_space() {
        let dir = TempDir::new().unwrap();
        let db = Database::init(&dir.path().join("seed.db"), &DatabaseConfig::default()).unwrap();

        let summary = seed_demo_data(&db).unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.contacts, 4);
        assert_eq!(stats.notifications, 4);
        assert_eq!(stats.room_configs, 1);
        // 3 invitations, 1 migration, 1 activation
        assert_eq!(stats.twincodes, 5);

        let conn = db.conn().unwrap();
        let current = Space::find_current(&conn).unwrap().unwrap();
        assert_eq!(current.id, summary.space_id);
    }
}
