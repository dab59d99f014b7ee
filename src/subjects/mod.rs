//! # Subjects: observer and observable in one.
//!
//! [`Subject`] is the multicast contract; [`PublishSubject`] relays live signals to every
//! current subscriber.

mod publish;
mod subject;

pub use publish::PublishSubject;
pub use subject::Subject;
