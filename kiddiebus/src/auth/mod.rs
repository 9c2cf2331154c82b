//! Authentication and authorization.
//!
//! Credential verification lives in the identity proxy in front of this
//! service; by the time a request arrives here it carries the caller's email
//! in a trusted header (`x-kiddiebus-user` by default). The
//! [`current_user`] extractor resolves that header to an active account and
//! rejects everything else, so handlers only ever see authenticated users.
//!
//! Authorization is role-based and per-resource:
//! - **Admins** see and manage everything.
//! - **Operators** manage the fleet and the students riding their routes.
//! - **Parents** see their own children and their own inbox, nothing more.
//!
//! The predicates in [`scope`] encode those rules; handlers call them rather
//! than matching on roles inline.

pub mod current_user;
pub mod scope;
