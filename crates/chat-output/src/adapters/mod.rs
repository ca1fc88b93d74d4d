pub mod google_chat;
