mod events;
mod interviews;
mod question_marks;
mod sessions;
mod snapshots;
