pub mod gym;
pub mod task;

pub use gym::{
  GymDayAssignment, GymExercise, GymExerciseHistory, GymExerciseRead, GymExerciseUpdate, NewGymExerciseHistory,
};
pub use task::{
  Importance, NewTaskHistory, TaskDescriptors, TaskHistory, TaskTemplate, TaskTemplateInput, TimeWindow,
};
