use serde::Serialize;
use uuid::Uuid;

use lingo_shared::clients::rabbitmq::RabbitMQClient;
use lingo_shared::types::event::{payloads, routing_keys, Event};

const SOURCE: &str = "lingo-social";

/// Fire-and-forget domain event sink. Without a broker every publish is a no-op.
#[derive(Clone, Default)]
pub struct EventPublisher {
    rabbitmq: Option<RabbitMQClient>,
}

impl EventPublisher {
    pub fn new(rabbitmq: RabbitMQClient) -> Self {
        Self { rabbitmq: Some(rabbitmq) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn rabbitmq(&self) -> Option<&RabbitMQClient> {
        self.rabbitmq.as_ref()
    }

    async fn publish<T: Serialize>(&self, event: Event<T>) {
        let Some(rabbitmq) = &self.rabbitmq else {
            tracing::trace!(event_type = %event.event_type, "event publishing disabled");
            return;
        };
        if let Err(e) = rabbitmq.publish(&event).await {
            tracing::error!(error = %e, event_type = %event.event_type, "failed to publish event");
        }
    }
}

pub async fn publish_profile_created(events: &EventPublisher, user_id: Uuid, username: &str) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_PROFILE_CREATED,
        payloads::ProfileCreated {
            user_id,
            username: username.to_string(),
        },
    )
    .with_user(user_id);
    events.publish(event).await;
}

pub async fn publish_profile_updated(events: &EventPublisher, user_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_PROFILE_UPDATED,
        payloads::ProfileUpdated { user_id },
    )
    .with_user(user_id);
    events.publish(event).await;
}

pub async fn publish_account_deleted(events: &EventPublisher, user_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_ACCOUNT_DELETED,
        payloads::AccountDeleted { user_id },
    )
    .with_user(user_id);
    events.publish(event).await;
}

pub async fn publish_friend_requested(
    events: &EventPublisher,
    request_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    sender_name: &str,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_FRIEND_REQUESTED,
        payloads::FriendRequested {
            request_id,
            sender_id,
            receiver_id,
            sender_name: sender_name.to_string(),
        },
    )
    .with_user(sender_id);
    events.publish(event).await;
}

pub async fn publish_friend_accepted(events: &EventPublisher, sender_id: Uuid, receiver_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_FRIEND_ACCEPTED,
        payloads::FriendAccepted {
            sender_id,
            receiver_id,
        },
    )
    .with_user(receiver_id);
    events.publish(event).await;
}

pub async fn publish_user_blocked(events: &EventPublisher, blocker_id: Uuid, blocked_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_USER_BLOCKED,
        payloads::UserBlocked {
            blocker_id,
            blocked_id,
        },
    )
    .with_user(blocker_id);
    events.publish(event).await;
}

pub async fn publish_post_created(events: &EventPublisher, post_id: Uuid, author_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_POST_CREATED,
        payloads::PostCreated { post_id, author_id },
    )
    .with_user(author_id);
    events.publish(event).await;
}

pub async fn publish_post_liked(events: &EventPublisher, post_id: Uuid, author_id: Uuid, liker_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_POST_LIKED,
        payloads::PostLiked {
            post_id,
            author_id,
            liker_id,
        },
    )
    .with_user(liker_id);
    events.publish(event).await;
}

pub async fn publish_comment_created(
    events: &EventPublisher,
    comment_id: Uuid,
    post_id: Uuid,
    post_author_id: Uuid,
    commenter_id: Uuid,
    content: &str,
) {
    let content_preview: String = content.chars().take(100).collect();
    let event = Event::new(
        SOURCE,
        routing_keys::SOCIAL_COMMENT_CREATED,
        payloads::CommentCreated {
            comment_id,
            post_id,
            post_author_id,
            commenter_id,
            content_preview,
        },
    )
    .with_user(commenter_id);
    events.publish(event).await;
}
