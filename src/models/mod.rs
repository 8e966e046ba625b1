pub mod auth;
pub mod booking;
pub mod bus;
pub mod profile;
pub mod ticket;
pub mod user;

// Re-export all the models that are used in other modules
pub use auth::{
    AuthResponse, ForgotPasswordRequest, GoogleLoginRequest, GoogleTokenInfo, LoginRequest,
    RefreshRequest, RegisterRequest, ResetPasswordRequest, TokenPair,
};
pub use booking::{
    Booking, BookingStatus, BookingStatusQuery, CreateBookingRequest, Passenger, PaymentStatus,
};
pub use bus::{
    AssignDriverRequest, Bus, BusResponse, Route, Seat, SeatAvailabilityResponse, SeatDateQuery,
    SeatMap,
};
pub use profile::{
    AdminUpdateUserRequest, AvatarRequest, ChangePasswordRequest, DeleteAccountRequest,
    UpdateProfileRequest, UserListQuery,
};
pub use ticket::{
    CreateTicketRequest, SupportTicket, TicketReply, TicketReplyRequest, TicketResponse,
    TicketStatus, TicketStatusQuery, TicketStatusRequest,
};
pub use user::{
    AuthProvider, Claims, DriverDetails, DriverLicense, PasswordReset, Role, ScheduleSlot,
    TokenKind, User, UserResponse, Vehicle,
};
