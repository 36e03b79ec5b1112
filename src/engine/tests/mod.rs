mod helpers;

mod tests_rotation;


mod tests_lifecycle;
