fn main() {
    sleeptracker_lib::run()
}
